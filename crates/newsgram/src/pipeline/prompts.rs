//! Prompt templates for the text and image providers.

use crate::sanitize;

/// Characters of article text sent for summarization.
const SUMMARY_INPUT_CHARS: usize = 2000;

/// Characters of the title rendered as image overlay text.
const OVERLAY_TITLE_CHARS: usize = 60;

/// Characters of the summary used as visual context.
const IMAGE_CONTEXT_CHARS: usize = 300;

pub fn render_query(template: &str, topic: &str) -> String {
    template.replace("{topic}", topic)
}

pub fn summary_prompt(topic: &str, content: &str) -> String {
    let excerpt = sanitize::truncate_chars(content.trim(), SUMMARY_INPUT_CHARS);
    format!(
        "Buat ringkasan berita yang informatif dari konten berikut:\n\n\
         Topik: {topic}\n\
         Konten: {excerpt}\n\n\
         Format ringkasan:\n\
         1. Judul yang menarik (1 baris)\n\
         2. Ringkasan inti berita (2-3 kalimat)\n\
         3. Poin-poin penting (maksimal 3 poin)\n\
         4. Konteks atau dampak berita (1 kalimat)\n\n\
         Gunakan bahasa Indonesia yang baik, ringkas dan faktual. Maksimal 150 kata."
    )
}

pub fn caption_prompt(topic: &str, title: &str, summary: &str, source: &str) -> String {
    format!(
        "Buat caption Instagram yang menarik untuk berita ini:\n\n\
         Judul: {title}\n\
         Ringkasan: {summary}\n\
         Topik: {topic}\n\
         Sumber: {source}\n\n\
         Format:\n\
         1. Hook menarik di awal (1-2 kalimat)\n\
         2. Summary berita dalam bahasa yang mudah dipahami (2-3 kalimat)\n\
         3. Call to action untuk engagement\n\
         4. 3-5 hashtags yang relevan dan trending\n\n\
         Gaya santai, tidak terlalu formal, dan mendorong interaksi. Maksimal 200 kata."
    )
}

pub fn image_prompt(topic: &str, title: &str, summary: &str, source: &str, size: &str) -> String {
    let overlay = overlay_text(title);
    let context = sanitize::truncate_chars(summary.trim(), IMAGE_CONTEXT_CHARS);
    format!(
        "Buat gambar Instagram yang menarik dan profesional untuk berita:\n\n\
         Judul Berita: {title}\n\
         Topik: {topic}\n\
         Konteks: {context}\n\
         Sumber: {source}\n\n\
         Desain modern dan bersih, warna yang sesuai dengan topik, \
         dioptimalkan untuk media sosial ({size}), dengan ruang untuk teks.\n\
         Text overlay: \"{overlay}\""
    )
}

/// The title cut to fit on the image, marked with `...` when shortened.
fn overlay_text(title: &str) -> String {
    let title = title.trim();
    let kept = sanitize::truncate_chars(title, OVERLAY_TITLE_CHARS);
    if kept.len() < title.len() {
        format!("{}...", kept)
    } else {
        kept.to_string()
    }
}
