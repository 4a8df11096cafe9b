//! relaymq – one binary that can start the broker *or* act as an
//! interactive client shell.
//
//  $ relaymq start --config relaymq.toml
//  $ relaymq connect 127.0.0.1:8443 --api-key supersecretkey
//  > sub test-channel
//  > pub test-channel hello
use relaymq::core::protocol;
use relaymq::{load_config, logging, start_broker, Config};

use clap::{Parser, Subcommand};
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};

use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};

#[derive(Debug, Parser)]
#[command(name = "relaymq", version, about = "RelayMQ broker & client shell")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the broker daemon.
    Start {
        /// Path to config TOML (env RELAYMQ_CONFIG overrides)
        #[arg(short, long, default_value = "relaymq.toml")]
        config: String,
    },
    /// Connect to a running broker in interactive mode.
    Connect {
        /// Broker address (host:port)
        addr: SocketAddr,
        /// API key presented with AUTH right after connecting.
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Start { config } => {
            let cfg_path: String = std::env::var("RELAYMQ_CONFIG").unwrap_or(config);
            let cfg: Config = load_config(&cfg_path)?;
            start_broker(cfg).await?;
        }
        Command::Connect { addr, api_key } => repl(addr, api_key).await?,
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────
// Interactive shell
// ───────────────────────────────────────────────────────────
async fn repl(addr: SocketAddr, api_key: Option<String>) -> anyhow::Result<()> {
    let mut rl: Editor<(), DefaultHistory> = DefaultEditor::new()?;

    let stream = TcpStream::connect(addr).await?;
    let (r, mut w) = stream.into_split();
    let mut reader = BufReader::new(r);

    println!("Connected to {addr}. Type `help` for commands.");

    // Background task printing responses and MSG pushes as they arrive.
    let printer: JoinHandle<()> = tokio::spawn(async move {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let trimmed = line.trim_end();

            if let Some(header) = protocol::parse_delivery_header(trimmed) {
                let mut payload = vec![0u8; header.len + 1];
                if reader.read_exact(&mut payload).await.is_err() {
                    break;
                }
                payload.pop(); // delimiter byte
                println!(
                    "[{}] {} @ {}",
                    header.id,
                    String::from_utf8_lossy(&payload),
                    header.channel
                );
            } else {
                println!("< {trimmed}");
            }
        }
    });

    if let Some(key) = api_key {
        w.write_all(format!("AUTH {key}\n").as_bytes()).await?;
    }

    loop {
        let Ok(line) = rl.readline("> ") else { break };
        let _ = rl.add_history_entry(line.as_str());

        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["help"] => println!(
                "auth <key> | sub <channel> | pub <channel> <msg> | detach | attach <id> | quit"
            ),
            ["exit" | "quit"] => {
                w.write_all(b"QUIT\n").await?;
                break;
            }
            ["auth", key] => w.write_all(format!("AUTH {key}\n").as_bytes()).await?,
            ["sub", channel] => {
                w.write_all(format!("SUBSCRIBE {channel}\n").as_bytes())
                    .await?
            }
            ["detach"] => w.write_all(b"DETACH\n").await?,
            ["attach", id] => w.write_all(format!("ATTACH {id}\n").as_bytes()).await?,
            ["pub", channel, rest @ ..] => {
                let body = rest.join(" ");
                let frame = format!("PUBLISH {channel} {}\n{body}\n", body.len());
                w.write_all(frame.as_bytes()).await?;
            }
            _ => println!("Unknown cmd. Type `help`."),
        }
        w.flush().await?;
    }

    drop(w);
    let _ = printer.await;
    Ok(())
}
