use colored::*;
use console::style;
use dialoguer::theme::ColorfulTheme;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn info(message: &str) {
    println!("{} {}", style("•").blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", style("✓").green(), message.green());
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red(), message.red());
}

pub fn warn(message: &str) {
    println!("{} {}", style("!").yellow(), message.yellow());
}

pub fn hint(message: &str) {
    println!("{} {}", style("»").cyan(), message.dimmed());
}

pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

pub fn progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn prompt_confirm(message: &str, default: bool) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact()
        .unwrap_or(default)
}

/// Returns the indices of the chosen items; empty when the prompt is
/// cancelled.
pub fn prompt_multi_select(message: &str, items: &[String], preselected: &[bool]) -> Vec<usize> {
    dialoguer::MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .items(items)
        .defaults(preselected)
        .interact()
        .unwrap_or_default()
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(console::measure_text_width(cell));
            }
        }
    }

    for (i, header) in headers.iter().enumerate() {
        print!("{:width$}  ", header.bold(), width = widths[i]);
    }
    println!();

    for width in &widths {
        print!("{}  ", "-".repeat(*width).dimmed());
    }
    println!();

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                let pad = widths[i].saturating_sub(console::measure_text_width(cell));
                print!("{}{}  ", cell, " ".repeat(pad));
            }
        }
        println!();
    }
}
