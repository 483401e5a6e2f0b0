//! Assistant chat command

use super::Context;
use colored::Colorize;
use sentinel_console::ChatTranscript;
use std::io::Write;

pub async fn handle(ctx: &Context, query: &str, session: Option<i64>) -> anyhow::Result<()> {
    let mut transcript = match session {
        Some(id) => ChatTranscript::with_session(id),
        None => ChatTranscript::new(),
    };

    let mut stdout = std::io::stdout();
    let result = transcript
        .send_with(ctx.api.as_ref(), query, |text| {
            let _ = write!(stdout, "{}", text);
            let _ = stdout.flush();
        })
        .await;
    println!();

    if let Some(id) = transcript.session_id() {
        eprintln!("{}", format!("session {} (continue with --session {})", id, id).dimmed());
    }
    result?;
    Ok(())
}
