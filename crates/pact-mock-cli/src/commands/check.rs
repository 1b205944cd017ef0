//! Check command: validate a pact file

use anyhow::{Context, Result};
use colored::*;
use pact_models::{Interaction, Pact};
use std::fs;
use std::path::Path;

/// Validate a pact file and print one line per interaction
pub fn run(file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read pact file: {}", file.display()))?;
    let pact = Pact::from_json_str(&content)
        .with_context(|| format!("Invalid pact file: {}", file.display()))?;

    println!(
        "{} {} -> {} ({} interactions)",
        "Valid pact:".green().bold(),
        pact.consumer.name,
        pact.provider.name,
        pact.interactions.len()
    );
    for (index, interaction) in pact.iter().enumerate() {
        println!("  {}. {}", index + 1, summarize(interaction));
    }
    Ok(())
}

fn summarize(interaction: &Interaction) -> String {
    let request = &interaction.request;
    let mut line = format!("{} {}", request.method.to_uppercase(), request.path);
    if let Some(query) = request.query_string() {
        line.push('?');
        line.push_str(&query);
    }
    line.push_str(&format!(" -> {}", interaction.response.status));
    if !interaction.description.is_empty() {
        line.push_str(&format!(" \"{}\"", interaction.description));
    }
    if !interaction.provider_states.is_empty() {
        let states: Vec<&str> = interaction
            .provider_states
            .iter()
            .map(|state| state.name.as_str())
            .collect();
        line.push_str(&format!(" given {}", states.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_models::{parse_query, ProviderState, RequestSpec, ResponseSpec};

    #[test]
    fn test_summarize() {
        let mut interaction = Interaction::new(
            "active users",
            RequestSpec::new("get", "/users").with_query(parse_query("active=true")),
            ResponseSpec::with_status(200),
        );
        interaction.provider_states.push(ProviderState {
            name: "users exist".to_string(),
            params: None,
        });
        assert_eq!(
            summarize(&interaction),
            "GET /users?active=true -> 200 \"active users\" given users exist"
        );
    }

    #[test]
    fn test_summarize_bare() {
        let interaction = Interaction::new("", RequestSpec::new("DELETE", "/x"), ResponseSpec::with_status(204));
        assert_eq!(summarize(&interaction), "DELETE /x -> 204");
    }
}
