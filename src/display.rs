//! Colored CLI output for server startup and maintenance commands.

use owo_colors::OwoColorize;

use crate::config::KioskConfig;
use crate::retention::DeletedCounts;

/// Print the startup banner with the effective configuration.
pub fn print_startup(config: &KioskConfig, database: &std::path::Path) {
    println!("{}", "campus-kiosk".bold().cyan());
    println!(
        "  {} {}:{}",
        "listening".dimmed(),
        config.server.host,
        config.server.port
    );
    println!(
        "  {} {} @ {}",
        "model".dimmed(),
        config.inference.model,
        config.inference.base_url
    );
    println!("  {} {}", "database".dimmed(), database.display());
    println!(
        "  {} chat={}d query={}d analytics={}d feedback={}d (cleanup at {:02}:00 UTC)",
        "retention".dimmed(),
        config.retention.chat_days,
        config.retention.query_days,
        config.retention.analytics_days,
        config.retention.feedback_days,
        config.retention.cleanup_hour
    );
}

/// Print knowledge base record counts.
pub fn print_knowledge_counts(faqs: usize, people: usize, facilities: usize, events: usize) {
    println!(
        "  {} {faqs} FAQs, {people} people, {facilities} facilities, {events} events",
        "knowledge".dimmed()
    );
}

/// Print the result of a retention cleanup pass.
pub fn print_retention_summary(counts: &DeletedCounts) {
    println!("{}", "retention cleanup".bold().cyan());
    println!("  chat history      {}", counts.chat);
    println!("  queries           {}", counts.queries);
    println!("  analytics events  {}", counts.analytics);
    println!("  feedback          {}", counts.feedback);
    println!("  {}             {}", "total".bold(), counts.total().green());
}

/// Print an inference health probe result.
pub fn print_health(model: &str, base_url: &str, ready: bool) {
    if ready {
        println!(
            "{} inference service at {base_url} is reachable (model {model})",
            "ok".green().bold()
        );
    } else {
        println!(
            "{} inference service at {base_url} is not reachable",
            "error".red().bold()
        );
    }
}
