use prompt_feedback_synthesizer::*;
use std::env;

/// Usage: `cargo run --example update_prompt [--dry-run]`
///
/// Reads PROMPT_API_URL, SUPABASE_URL and SUPABASE_ANON_KEY (a `.env` file
/// works too). With `--dry-run` the new prompt is printed instead of saved.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let dry_run = env::args().any(|a| a == "--dry-run");
    let config = RemoteConfig::from_env()?;

    let store = HttpPromptStore::new(&config.prompt_api_url);
    let feedback = SupabaseFeedbackRepository::new(SupabaseClient::new(
        &config.supabase_url,
        &config.supabase_key,
    ));

    if dry_run {
        let current = store.get().await?;
        let records = feedback.list_negative_feedback().await?;
        let synthesis = synthesize_with_report(&current, &records, &config.format)?;
        println!("{}", synthesis.text);
        eprintln!("{}", serde_json::to_string_pretty(&synthesis.report)?);
        return Ok(());
    }

    let updater = PromptUpdater::new(store, feedback).with_format(config.format);
    match updater.update_prompt().await? {
        UpdateOutcome::Written(report) => {
            println!(
                "✅ Prompt updated: {} new feedback entries, {} new FAQ entries",
                report.feedback.synthesized, report.faq.synthesized
            );
        }
        UpdateOutcome::Unchanged(_) => println!("Prompt already up to date"),
    }

    Ok(())
}
