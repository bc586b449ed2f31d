use super::ui;
use crate::core::aggregator::QuoteAggregator;
use crate::core::config::AppConfig;
use crate::core::ranking;
use crate::core::{ComparisonRequest, Quote, QuoteScope};
use crate::providers::build_providers;
use anyhow::{Context, Result};
use chrono::Local;
use comfy_table::{Cell, Table};
use indicatif::ProgressBar;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Options for a single comparison run, as given on the command line.
#[derive(Debug, Clone)]
pub struct CompareArgs {
    pub amount: Decimal,
    pub send_currency: String,
    pub receive_currency: String,
    pub send_country: String,
    pub receive_country: String,
    /// Overrides the configured scope when set.
    pub scope: Option<QuoteScope>,
    pub by_category: bool,
    pub json: bool,
}

impl Default for CompareArgs {
    fn default() -> Self {
        let request = ComparisonRequest::default();
        CompareArgs {
            amount: request.amount,
            send_currency: request.send_currency,
            receive_currency: request.receive_currency,
            send_country: request.send_country,
            receive_country: request.receive_country,
            scope: None,
            by_category: false,
            json: false,
        }
    }
}

impl CompareArgs {
    pub fn request(&self) -> Result<ComparisonRequest> {
        let request = ComparisonRequest::new(
            self.amount,
            &self.send_currency,
            &self.receive_currency,
            &self.send_country,
            &self.receive_country,
        )?;
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorRecord {
    pub error: String,
}

pub async fn run(args: &CompareArgs, mut config: AppConfig) -> Result<()> {
    let request = args.request()?;
    if let Some(scope) = args.scope {
        config.scope = scope;
    }

    let aggregator = QuoteAggregator::new(build_providers(&config)?);
    info!(
        amount = %request.amount,
        from = %request.send_country,
        to = %request.receive_country,
        "Comparing providers"
    );

    let pb = if args.json {
        ProgressBar::hidden()
    } else {
        ui::new_progress_bar(aggregator.provider_count() as u64)
    };
    pb.set_message("Fetching quotes");
    let quotes = aggregator
        .compare_with_progress(&request, &|| pb.inc(1))
        .await;
    pb.finish_and_clear();

    let ranked = ranking::rank(quotes);
    let output = if args.json {
        render_json(&ranked, args.by_category)?
    } else {
        render_text(&ranked, &request, args.by_category)
    };
    println!("{output}");
    Ok(())
}

pub fn render_json(quotes: &[Quote], by_category: bool) -> Result<String> {
    let json = if by_category {
        serde_json::to_string_pretty(&ranking::partition(quotes))
    } else {
        serde_json::to_string_pretty(quotes)
    };
    json.context("Failed to serialize quotes")
}

pub fn error_json(error: &anyhow::Error) -> String {
    let record = ErrorRecord {
        error: format!("{error:#}"),
    };
    serde_json::to_string(&record).unwrap_or_else(|_| r#"{"error":"unknown error"}"#.to_string())
}

pub fn render_text(quotes: &[Quote], request: &ComparisonRequest, by_category: bool) -> String {
    let title = format!(
        "Sending {} {} from {} to {} ({})",
        request.amount,
        request.send_currency,
        request.send_country,
        request.receive_country,
        request.receive_currency
    );
    let mut lines = vec![ui::style_text(&title, ui::StyleType::Title)];

    if by_category {
        let grouped = ranking::partition(quotes);
        for (category, section) in grouped.sections() {
            lines.push(String::new());
            lines.push(ui::style_text(&category.to_string(), ui::StyleType::Title));
            lines.push(section_text(section, request));
        }
    } else {
        lines.push(section_text(quotes, request));
    }

    let footer = format!(
        "{} quote(s), fetched at {}",
        quotes.len(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    lines.push(ui::style_text(&footer, ui::StyleType::Subtle));
    lines.join("\n")
}

fn section_text(quotes: &[Quote], request: &ComparisonRequest) -> String {
    if quotes.is_empty() {
        ui::style_text("No offers available.", ui::StyleType::Error)
    } else {
        quote_table(quotes, request).to_string()
    }
}

/// Quotes are expected ranked; the first row is highlighted.
fn quote_table(quotes: &[Quote], request: &ComparisonRequest) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Provider"),
        ui::header_cell("Rate"),
        ui::header_cell("Fee"),
        ui::header_cell("Recipient gets"),
    ]);

    for (i, quote) in quotes.iter().enumerate() {
        let gets = format!("{:.2} {}", quote.recipient_gets, request.receive_currency);
        table.add_row(vec![
            Cell::new(&quote.provider),
            ui::number_cell(format!("{:.4}", quote.rate)),
            ui::number_cell(format_fee(quote.fee, &request.send_currency)),
            if i == 0 {
                ui::best_cell(gets)
            } else {
                ui::number_cell(gets)
            },
        ]);
    }
    table
}

fn format_fee(fee: Decimal, currency: &str) -> String {
    if fee.is_zero() {
        "FREE".to_string()
    } else {
        format!("{fee:.2} {currency}")
    }
}
