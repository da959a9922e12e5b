//! Baseline prompt sent to every model.

/// Instructions preceding the challenge statement.
pub const BASELINE_INSTRUCTIONS: &str = "You are a senior software engineer. \
Solve the LeetCode challenge below strictly in Python 3. \
Return ONLY the source code inside a Markdown code block. \
The code must be self-contained, with no external dependencies, and contain the main solution function. \
Do not include explanations, usage examples or comments outside the code.";

/// Build the baseline prompt for a challenge statement.
pub fn build_baseline_prompt(statement: &str) -> String {
    format!("{}\n\nCHALLENGE: {}", BASELINE_INSTRUCTIONS, statement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_ends_with_statement() {
        let prompt = build_baseline_prompt("<p>Given an array nums...</p>");
        assert!(prompt.starts_with("You are a senior software engineer."));
        assert!(prompt.contains("strictly in Python 3"));
        assert!(prompt.ends_with("\n\nCHALLENGE: <p>Given an array nums...</p>"));
    }

    #[test]
    fn test_statement_is_not_escaped() {
        let prompt = build_baseline_prompt("a {b} \"c\"");
        assert!(prompt.ends_with("a {b} \"c\""));
    }
}
