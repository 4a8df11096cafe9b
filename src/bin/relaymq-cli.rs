//! relaymq-cli – one-shot test clients for a running broker.
//
//  $ relaymq-cli pub 127.0.0.1:8443 test-channel "hello" --api-key k
//  $ relaymq-cli sub 127.0.0.1:8443 test-channel --api-key k
//  $ relaymq-cli attach 127.0.0.1:8443 7 --api-key k
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpStream,
};

use relaymq::core::protocol::{self, DeliveryHeader};

#[derive(Debug, Parser)]
#[command(name = "relaymq-cli", version, about = "RelayMQ test clients")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
    /// API key presented with AUTH right after connecting.
    #[arg(long, global = true)]
    api_key: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish one message and print the assigned message id.
    Pub {
        addr: SocketAddr,
        channel: String,
        message: String,
    },
    /// Subscribe and stream deliveries to stdout.
    Sub {
        addr: SocketAddr,
        channel: String,
        /// Detach (instead of terminating) after this many deliveries.
        #[arg(long)]
        detach_after: Option<usize>,
    },
    /// Re-attach to a detached subscription and stream its backlog.
    Attach { addr: SocketAddr, id: u64 },
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr, api_key: Option<&str>) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (r, w) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(r),
            writer: w,
        };
        if let Some(key) = api_key {
            let reply = client.command(&format!("AUTH {key}")).await?;
            if reply != "OK" {
                bail!("authentication failed: {reply}");
            }
        }
        Ok(client)
    }

    /// Send one command line and return its response line.
    async fn command(&mut self, line: &str) -> anyhow::Result<String> {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await?;
        self.read_line().await
    }

    async fn read_line(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            bail!("broker closed the connection");
        }
        Ok(line.trim_end().to_string())
    }

    /// Next MSG push, header plus payload (delimiter consumed).
    async fn read_delivery(&mut self) -> anyhow::Result<(DeliveryHeader, Vec<u8>)> {
        let line = self.read_line().await?;
        let header = protocol::parse_delivery_header(&line)
            .with_context(|| format!("expected MSG frame, got: {line}"))?;
        let mut payload = vec![0u8; header.len + 1];
        self.reader.read_exact(&mut payload).await?;
        payload.pop();
        Ok((header, payload))
    }
}

fn print_delivery(header: &DeliveryHeader, payload: &[u8]) {
    println!(
        "[{}] {} @ {}",
        header.id,
        String::from_utf8_lossy(payload),
        header.channel
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let api_key = cli.api_key.as_deref();

    match cli.cmd {
        Command::Pub {
            addr,
            channel,
            message,
        } => {
            let mut client = Client::connect(addr, api_key).await?;
            client
                .writer
                .write_all(format!("PUBLISH {channel} {}\n", message.len()).as_bytes())
                .await?;
            client.writer.write_all(message.as_bytes()).await?;
            client.writer.write_all(b"\n").await?;
            let reply = client.read_line().await?;
            println!("{reply}");
            let _ = client.command("QUIT").await;
        }

        Command::Sub {
            addr,
            channel,
            detach_after,
        } => {
            let mut client = Client::connect(addr, api_key).await?;
            let reply = client.command(&format!("SUBSCRIBE {channel}")).await?;
            println!("{reply}");

            let mut received = 0usize;
            loop {
                if detach_after == Some(received) {
                    let reply = client.command("DETACH").await?;
                    println!("{reply}");
                    return Ok(());
                }
                let (header, payload) = client.read_delivery().await?;
                print_delivery(&header, &payload);
                received += 1;
            }
        }

        Command::Attach { addr, id } => {
            let mut client = Client::connect(addr, api_key).await?;
            let reply = client.command(&format!("ATTACH {id}")).await?;
            let Some(pending) = reply
                .strip_prefix("OK ")
                .and_then(|v| v.parse::<usize>().ok())
            else {
                bail!("attach failed: {reply}");
            };
            println!("attached; {pending} pending");
            for _ in 0..pending {
                let (header, payload) = client.read_delivery().await?;
                print_delivery(&header, &payload);
            }
            let _ = client.command("QUIT").await;
        }
    }
    Ok(())
}
