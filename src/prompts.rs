//! Instruction prompt sent alongside every uploaded plant photo.
//!
//! Kept in one place so the wording can change without touching the
//! analysis client. Callers can override it via
//! [`crate::config::ServerConfig::analysis_prompt`].

/// Default instruction for the vision model.
///
/// The response is shown verbatim in the browser and in the PDF report, so
/// the model is told explicitly not to use Markdown.
pub const PLANT_ANALYSIS_PROMPT: &str = "Analyze this plant image and provide detailed analysis of its species, health, and care recommendations, its characteristics, care instructions, and any interesting facts. Please provide the response in plain text without using any markdown formatting";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_covers_every_section() {
        for topic in ["species", "health", "care", "characteristics", "interesting facts"] {
            assert!(PLANT_ANALYSIS_PROMPT.contains(topic), "missing {topic}");
        }
        assert!(PLANT_ANALYSIS_PROMPT.contains("without using any markdown"));
    }
}
