use std::error::Error;
use std::fs;
use std::time::Duration;

use gated_lead_form::config::DemoConfig;
use gated_lead_form::core::observability;
use gated_lead_form::events::InteractionEvent;
use gated_lead_form::log;
use gated_lead_form::logging::{self, LogLevel};
use gated_lead_form::page::LandingPage;
use gated_lead_form::shadow::SubmitOutcome;

fn load_config() -> Result<DemoConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => DemoConfig::from_json(&fs::read_to_string(&path)?),
        None => Ok(DemoConfig::lead_demo()),
    }
}

/// A visitor who moves, scrolls and types, then fills the visible fields.
async fn human_session(config: &DemoConfig) -> Result<(), Box<dyn Error>> {
    println!("=== Human session ===");
    let page = LandingPage::open(config);
    let mut page = scopeguard::guard(page, |mut page| page.teardown());

    for (delay_ms, event) in [
        (300, InteractionEvent::pointer_move()),
        (700, InteractionEvent::scroll()),
        (900, InteractionEvent::key_press()),
    ] {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        page.dispatch(event);
        page.sync_gate();
    }
    page.wait_until_ready().await;

    let snapshot = page.snapshot();
    log!(LogLevel::Info, "gate opened after {}s", snapshot.seconds_elapsed);

    let form = page.form().ok_or("form was not constructed")?;
    form.fill_by_label("Name", " Ada Lovelace ")?;
    form.fill_by_label("Work Email", "ada@analytics.io")?;
    form.fill_by_label("Message", "")?;
    let outcome = form.submit();
    println!("First attempt: {:?} ({})", outcome, form.submit_button().label);

    form.fill_by_label("Message", "We want to stop headless form spam.")?;
    let outcome = form.submit();
    println!("Second attempt: {:?}", outcome);
    page.refresh();

    if let Some(lead) = page.submitted() {
        println!("Anti-bot demo submission {}", serde_json::to_string(&lead)?);
    }
    if let Some(line) = page.confirmation() {
        println!("{line}");
    }
    Ok(())
}

/// A scraper that snapshots the page and fills every control it can reach.
async fn bot_session(config: &DemoConfig) -> Result<(), Box<dyn Error>> {
    println!("=== Naive bot session ===");
    let page = LandingPage::open(config);
    let mut page = scopeguard::guard(page, |mut page| page.teardown());

    let inputs = page.document().query_selector_all("input")?.len();
    println!("Immediate scrape found {inputs} inputs");

    // Synthetic events still have to wait out the dwell time.
    page.dispatch(InteractionEvent::pointer_move());
    page.dispatch(InteractionEvent::scroll());
    page.dispatch(InteractionEvent::key_press());
    page.wait_until_ready().await;

    let document = page.document();
    let inputs = document.query_selector_all("input")?.len() + document.query_selector_all("textarea")?.len();
    println!("Scrape after unlock found {inputs} inputs");

    let form = page.form().ok_or("form was not constructed")?;
    for control in form.controls() {
        form.fill(control.index, "bot@spam.example")?;
    }
    let outcome = form.submit();
    let button = form.submit_button();
    println!(
        "Bot attempt: {:?} (label {:?}, disabled {})",
        outcome, button.label, button.disabled
    );
    if outcome != SubmitOutcome::Blocked {
        return Err("honeypot did not block the bot".into());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config()?;
    logging::set_log_level(config.log_level);
    println!("Gated lead form demo (local only, nothing is transmitted)");

    human_session(&config).await?;
    bot_session(&config).await?;

    let stats = observability::snapshot();
    println!(
        "[stats] constructed={} accepted={} honeypot={} incomplete={}",
        stats.forms_constructed,
        stats.submissions_accepted,
        stats.honeypot_rejections,
        stats.incomplete_rejections
    );
    Ok(())
}
