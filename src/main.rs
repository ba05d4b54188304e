/// SIMBA capture replay utility
///
/// Reads a pcap capture, demultiplexes the SIMBA multicast feed and decodes
/// every datagram in capture order. Prints a statistics report on completion.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use simba_feed::pcap::{self, PcapReader};
use simba_feed::{DecodedMessage, FeedStats, SimbaDecoder};

#[derive(Parser, Debug)]
#[command(
    name = "simba-feed",
    version,
    about = "Decode SIMBA SPECTRA market data from a pcap capture"
)]
struct Cli {
    /// Capture file to replay
    capture: PathBuf,

    /// Decode every UDP payload instead of only the SIMBA multicast feed
    #[arg(long)]
    no_filter: bool,

    /// Print each decoded message to stdout
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut reader = PcapReader::open(&cli.capture)
        .with_context(|| format!("cannot open capture {}", cli.capture.display()))?;

    let mut decoder = SimbaDecoder::new();
    let mut feed_stats = FeedStats::new();

    loop {
        let record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "capture ended early");
                break;
            }
        };

        let Some(datagram) = pcap::udp_payload(&record.data) else {
            continue;
        };
        if !cli.no_filter && !datagram.is_simba() {
            continue;
        }

        feed_stats.record_datagram(datagram.payload.len());
        let started = Instant::now();
        let decoded = decoder.decode(datagram.payload);
        feed_stats.record_decode_latency(started.elapsed().as_micros() as u64);

        if let Some(message) = decoded {
            if cli.verbose {
                print_message(&message);
            } else {
                debug!(
                    template = message.template_id(),
                    security_id = message.security_id(),
                    "decoded message"
                );
            }
        }
    }

    feed_stats.print_summary();
    println!();
    decoder.statistics().print_summary();

    let gaps = decoder.sequence_gaps();
    if !gaps.is_empty() {
        println!("Gap ranges: {gaps:?}");
    }

    Ok(())
}

fn print_message(message: &DecodedMessage) {
    match message {
        DecodedMessage::OrderUpdate(update) => {
            println!(
                "OrderUpdate security={} entry={} px={} size={} rpt_seq={} action={} type={}",
                update.security_id,
                update.md_entry_id,
                update.md_entry_px,
                update.md_entry_size,
                update.rpt_seq,
                update.update_action,
                update.entry_type,
            );
        }
        DecodedMessage::OrderExecution(execution) => {
            println!(
                "OrderExecution security={} entry={} last_px={} last_qty={} trade={} rpt_seq={}",
                execution.security_id,
                execution.md_entry_id,
                execution.last_px,
                execution.last_qty,
                execution.trade_id,
                execution.rpt_seq,
            );
        }
        DecodedMessage::OrderBookSnapshot(snapshot) => {
            println!(
                "OrderBookSnapshot security={} rpt_seq={} session={} entries={}",
                snapshot.security_id,
                snapshot.rpt_seq,
                snapshot.exchange_trading_session_id,
                snapshot.entries.len(),
            );
        }
    }
}
