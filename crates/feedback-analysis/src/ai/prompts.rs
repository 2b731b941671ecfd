//! Prompt templates shared by the HTTP providers.

use crate::types::{Category, MAX_KEY_POINTS};

/// Prompt asking for a JSON classification of one feedback entry.
pub fn classification_prompt(text: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are reviewing customer feedback for a tour operator.\n\n\
        FEEDBACK:\n\"{text}\"\n\n\
        Respond with a JSON object containing:\n\
        - \"sentiment\": one of \"positive\", \"negative\" or \"neutral\"\n\
        - \"category\": exactly one of {categories}\n\
        - \"key_points\": a list of at most {MAX_KEY_POINTS} short strings\n\n\
        Return ONLY the JSON object."
    )
}

/// Prompt asking for a short summary of one category's feedback.
pub fn summary_prompt(category: Category, samples: &[String]) -> String {
    format!(
        "Here are {} customer feedback entries for a tour operator in the \
        \"{}\" category:\n\n{}\n\n\
        Write a concise summary (at most 150 words) that names recurring themes, \
        calls out the main strengths and concerns, and states whether sentiment \
        is mostly positive, mixed or mostly negative.\n\n\
        Return ONLY the summary text.",
        samples.len(),
        category.display_name(),
        encode_samples(samples)
    )
}

/// Prompt asking for a JSON array of improvement suggestions.
pub fn suggestions_prompt(category: Category, samples: &[String]) -> String {
    format!(
        "You advise a tour operator on improving customer satisfaction.\n\n\
        Read these {} feedback entries in the \"{}\" category:\n\n{}\n\n\
        Propose 3 to 5 specific, practical improvements that address the most \
        common complaints. Give each a title of 1-5 words and a one or two \
        sentence explanation.\n\n\
        Return ONLY a JSON array of objects with \"title\" and \"explanation\" keys.",
        samples.len(),
        category.display_name(),
        encode_samples(samples)
    )
}

fn encode_samples(samples: &[String]) -> String {
    serde_json::to_string(samples).unwrap_or_else(|_| samples.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_prompt_lists_categories() {
        let prompt = classification_prompt("The bus was late");
        assert!(prompt.contains("The bus was late"));
        assert!(prompt.contains("\"value_for_money\""));
        assert!(prompt.contains("at most 3"));
    }

    #[test]
    fn test_insight_prompts_embed_samples() {
        let samples = vec!["Cold soup".to_string(), "Great \"local\" dishes".to_string()];
        let prompt = summary_prompt(Category::FoodDining, &samples);
        assert!(prompt.contains("Food Dining"));
        assert!(prompt.contains(r#""Great \"local\" dishes""#));

        let prompt = suggestions_prompt(Category::FoodDining, &samples);
        assert!(prompt.contains("2 feedback entries"));
        assert!(prompt.contains("JSON array"));
    }
}
