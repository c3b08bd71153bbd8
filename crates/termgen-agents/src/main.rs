use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use termgen_agents::arxiv::{ArxivSource, PaperSource};
use termgen_agents::{
    GenConfig, OpenAiBackend, PaperGroup, RecordBuilder, SessionContext, SessionStatus,
    WorkflowSession,
};

/// Generate quality-gated bilingual training sentences for technical terms.
#[derive(Parser, Debug)]
#[command(name = "termgen-agents", version)]
struct Cli {
    /// Target technical term; repeat for multiple terms (one session each).
    #[arg(long = "term", required = true)]
    terms: Vec<String>,

    /// Which search result to use as the reference paper.
    #[arg(long, default_value_t = 0)]
    paper_index: usize,

    /// arXiv search query; defaults to the terms joined with ", ".
    #[arg(long)]
    query: Option<String>,

    /// Maximum search results to fetch.
    #[arg(long, default_value_t = 10)]
    max_results: usize,

    /// Override the configured round budget per session.
    #[arg(long)]
    rounds: Option<u32>,

    /// Skip the pre-invocation rate-limit delay.
    #[arg(long, default_value_t = false)]
    no_pacing: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = GenConfig::from_env();
    if let Some(rounds) = cli.rounds {
        config.round_budget = rounds;
    }
    if cli.no_pacing {
        config.pacing_delay_secs = 0;
    }
    let backend = OpenAiBackend::new(&config).context("invalid configuration")?;

    // Ctrl-C interrupts the pending stage call and exhausts the session.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let query = cli.query.unwrap_or_else(|| cli.terms.join(", "));
    let source = ArxivSource::default();
    let papers = source.search(&query, cli.max_results).await?;
    if papers.is_empty() {
        bail!("no papers found for query {query:?}");
    }
    let metadata = papers
        .get(cli.paper_index)
        .with_context(|| format!("paper_index {} out of {} results", cli.paper_index, papers.len()))?
        .clone();
    info!(paper = %metadata.title, domain = %metadata.domain, "reference paper selected");

    let mut group = PaperGroup::new(metadata.clone());
    for term in &cli.terms {
        if cancel.is_cancelled() {
            warn!("cancelled, stopping before remaining terms");
            break;
        }
        let terms: BTreeSet<String> = [term.clone()].into();
        let ctx = SessionContext::new(terms, metadata.summary.clone());
        let mut session = WorkflowSession::from_config(&config, ctx);

        let status = session.run(&backend, &cancel).await?;
        let record = RecordBuilder::build(&session, &metadata);
        if status == SessionStatus::Exhausted {
            warn!(
                term,
                rounds = session.round_count(),
                "round budget exhausted, recording best effort"
            );
        } else {
            info!(term, score = record.score, "session accepted");
        }
        group.push(record);
    }

    println!("{}", serde_json::to_string_pretty(&group)?);
    Ok(())
}
