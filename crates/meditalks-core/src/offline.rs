//! Static text served when no backend could answer.
//!
//! Callers must flag anything built here as degraded.

use crate::language::Language;

/// Source identifier reported for degraded output.
pub const OFFLINE_SOURCE: &str = "offline-template";

/// Lead-in and closing line for each language.
fn template(language: Language) -> (&'static str, &'static str) {
    match language {
        Language::En => (
            "Important health advice",
            "Please consult your doctor for more information.",
        ),
        Language::Th => (
            "คำแนะนำสำคัญเกี่ยวกับสุขภาพ",
            "กรุณาปรึกษาแพทย์สำหรับข้อมูลเพิ่มเติม",
        ),
        Language::Vi => (
            "Lời khuyên sức khỏe quan trọng",
            "Vui lòng tham khảo ý kiến bác sĩ để biết thêm thông tin",
        ),
        Language::Ms => (
            "Nasihat kesihatan penting",
            "Sila rujuk doktor untuk maklumat lanjut",
        ),
        Language::Km => (
            "ដំបូន្មានសុខភាពសំខាន់",
            "សូមពិគ្រោះជាមួយគ្រូពេទ្យសម្រាប់ព័ត៌មានបន្ថែម",
        ),
        Language::Tl => (
            "Mahalagang payo sa kalusugan",
            "Pakipag-usap sa inyong doktor para sa karagdagang impormasyon.",
        ),
    }
}

/// Wrap the untranslated message in the target language's lead-in and
/// closing line.
pub fn offline_adaptation(message: &str, language: Language) -> String {
    let (lead, closing) = template(language);
    format!("{lead}: {}\n\n{closing}", message.trim())
}
