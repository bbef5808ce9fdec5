//! The AI strategy — classification-gated generation with a fixed
//! fallback.
//!
//! Two completion calls per invocation: a cheap low-temperature probe
//! deciding whether the message concerns religious/legal rulings, then a
//! generation call under one of two instruction profiles. Every failure
//! mode collapses into the fixed fallback reply; nothing propagates.

use balas_core::completion::CompletionRequest;
use balas_core::error::CompletionError;
use balas_core::profile::OrgProfile;
use tracing::{debug, warn};

use crate::Resolver;

pub(crate) const CLASSIFY_MAX_TOKENS: u32 = 10;
pub(crate) const CLASSIFY_TEMPERATURE: f32 = 0.1;
pub(crate) const GENERATE_MAX_TOKENS: u32 = 500;
pub(crate) const GENERATE_TEMPERATURE: f32 = 0.7;

/// The affirmative marker the classification probe is asked to emit.
/// Matched case-insensitively anywhere in the response, so surrounding
/// prose does not break detection.
const AFFIRMATIVE_MARKER: &str = "YA";

/// Appended after generated answers on sensitive topics.
const SENSITIVE_DISCLAIMER: &str = "_Mohon maaf jika informasi kurang akurat. Untuk informasi \
lebih lengkap dan akurat, silakan kunjungi https://konsultasisyariah.net/ atau berkonsultasi \
langsung dengan ustad kami._";

fn classification_prompt(message: &str) -> String {
    format!(
        "Analisa apakah pertanyaan berikut adalah tentang hukum Islam, fatwa, aturan agama, \
         atau konsultasi syariah.\n\
         Jawab hanya dengan \"YA\" jika tentang hukum Islam/agama, atau \"TIDAK\" jika \
         pertanyaan umum lainnya.\n\n\
         Pertanyaan: {message}\n\nJawab:"
    )
}

fn org_summary(profile: &OrgProfile) -> String {
    format!(
        "Informasi Organisasi:\n\
         - Nama: {}\n\
         - Jenis: {}\n\
         - Telepon: {}\n\
         - Email: {}\n\
         - Alamat: {}\n\
         - Jam Operasional: {}",
        profile.company_name,
        profile.business,
        profile.phone,
        profile.email,
        profile.address,
        profile.operational_hours
    )
}

/// Cautious profile for religious/legal questions: brief, general,
/// refer to a human expert.
fn sensitive_instructions(profile: &OrgProfile) -> String {
    format!(
        "Anda adalah asisten virtual untuk {}.\n\n{}\n\n\
         Tugas Anda:\n\
         1. Berikan jawaban UMUM dan SINGKAT tentang pertanyaan hukum Islam\n\
         2. Jangan berikan fatwa detail\n\
         3. Arahkan untuk konsultasi lebih lanjut ke ustad/ahli\n\
         4. Gunakan bahasa Indonesia yang sopan dan ramah\n\
         5. Maksimal 2-3 kalimat saja\n\
         6. Bersifat informatif namun berhati-hati\n\n\
         Jawab dengan nada ramah dan hati-hati.",
        profile.company_name,
        org_summary(profile)
    )
}

/// Informative profile for general questions, grounded in the org data.
fn general_instructions(profile: &OrgProfile) -> String {
    format!(
        "Anda adalah asisten virtual untuk {}.\n\n{}\n\n\
         Tugas Anda:\n\
         1. Jawab pertanyaan dengan ramah dan informatif\n\
         2. Berikan informasi yang akurat berdasarkan data di atas\n\
         3. Jika ditanya tentang jadwal kegiatan, sarankan untuk menghubungi langsung\n\
         4. Jika ditanya tentang donasi/infaq, berikan informasi kontak\n\
         5. Gunakan bahasa Indonesia yang sopan dan ramah\n\
         6. Jawab dengan singkat dan jelas (maksimal 3-4 kalimat)\n\
         7. Jika tidak tahu, arahkan untuk menghubungi kontak resmi\n\n\
         Jawab dengan nada ramah dan membantu.",
        profile.company_name,
        org_summary(profile)
    )
}

/// The reply used whenever the AI strategy cannot produce usable text.
pub(crate) fn fallback_reply(profile: &OrgProfile) -> String {
    format!(
        "Terima kasih atas pesan Anda. Untuk informasi lebih lanjut, silakan hubungi kami \
         di {} atau {}.",
        profile.phone, profile.email
    )
}

impl Resolver {
    /// Run the AI strategy. Infallible by construction: any sub-call
    /// failure yields the fixed fallback.
    pub(crate) async fn ai_reply(&self, message: &str, profile: &OrgProfile) -> String {
        match self.classify_and_generate(message, profile).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "AI strategy failed, using fixed fallback");
                fallback_reply(profile)
            }
        }
    }

    async fn classify_and_generate(
        &self,
        message: &str,
        profile: &OrgProfile,
    ) -> Result<String, CompletionError> {
        // Step 1: topic classification. An empty or ambiguous verdict
        // counts as "general"; only a failed call aborts to the fallback.
        let verdict = self
            .completion
            .complete(CompletionRequest {
                instructions: None,
                user_text: classification_prompt(message),
                max_tokens: CLASSIFY_MAX_TOKENS,
                temperature: CLASSIFY_TEMPERATURE,
            })
            .await?;
        let sensitive = verdict.to_uppercase().contains(AFFIRMATIVE_MARKER);
        debug!(sensitive, "Topic classification");

        // Step 2: generation under the selected instruction profile.
        let instructions = if sensitive {
            sensitive_instructions(profile)
        } else {
            general_instructions(profile)
        };
        let generated = self
            .completion
            .complete(CompletionRequest {
                instructions: Some(instructions),
                user_text: message.to_string(),
                max_tokens: GENERATE_MAX_TOKENS,
                temperature: GENERATE_TEMPERATURE,
            })
            .await?;

        let generated = generated.trim();
        if generated.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        if sensitive {
            Ok(format!("{generated}\n\n{SENSITIVE_DISCLAIMER}"))
        } else {
            Ok(generated.to_string())
        }
    }
}
