use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use lora_uplink::config::Config;
use lora_uplink::lorawan::{self, crypto, Direction, UplinkBuilder};

#[derive(Parser)]
#[command(name = "lora-uplink")]
#[command(about = "Encode LoRaWAN unconfirmed uplink data frames")]
#[command(version)]
struct Cli {
    /// Path to device configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Frame counter for this uplink (full 32-bit value)
    #[arg(long)]
    fcnt: u32,

    /// Application payload as text
    #[arg(long, required_unless_present_any = ["payload_hex", "decode"])]
    payload: Option<String>,

    /// Application payload as a hex string
    #[arg(long, conflicts_with = "payload")]
    payload_hex: Option<String>,

    /// Override the configured FPort
    #[arg(long)]
    fport: Option<u8>,

    /// Print a JSON record instead of the bare hex frame
    #[arg(long)]
    json: bool,

    /// Decode and verify a received uplink frame (hex) instead of encoding
    #[arg(long, conflicts_with_all = ["payload", "payload_hex", "fport"])]
    decode: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Device keys are caller-supplied configuration; a missing config is an
    // error, not a fallback.
    let config = Config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let dev_addr = config.device.dev_addr()?;
    let keys = config.device.session_keys()?;

    if let Some(frame_hex) = &cli.decode {
        let frame = hex::decode(frame_hex)
            .map_err(|e| anyhow::anyhow!("Invalid frame hex: {}", e))?;

        let decoded = lorawan::decode_uplink(&frame)?;
        info!("{}", decoded);

        let mic_ok = lorawan::verify_uplink_mic(&frame, &keys.nwk_s_key, cli.fcnt)?;
        let plaintext = crypto::decrypt_frm_payload(
            &decoded.frm_payload,
            &keys.app_s_key,
            &decoded.dev_addr,
            cli.fcnt,
            Direction::Uplink,
        )?;

        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "dev_addr": decoded.dev_addr.to_string(),
                    "fcnt": decoded.fcnt,
                    "f_port": decoded.f_port,
                    "mic_ok": mic_ok,
                    "payload_hex": hex::encode(&plaintext),
                })
            );
        } else {
            println!("mic: {}", if mic_ok { "ok" } else { "INVALID" });
            println!("payload: {}", hex::encode(&plaintext));
        }
        return Ok(());
    }

    let payload = match (&cli.payload, &cli.payload_hex) {
        (Some(text), _) => text.clone().into_bytes(),
        (None, Some(h)) => hex::decode(h).map_err(|e| anyhow::anyhow!("Invalid payload hex: {}", e))?,
        (None, None) => unreachable!("clap enforces payload or payload-hex"),
    };

    let f_port = cli.fport.unwrap_or(config.uplink.f_port);
    debug!(
        "Encoding uplink: DevAddr={} FCnt={} FPort={} payload={} bytes",
        dev_addr,
        cli.fcnt,
        f_port,
        payload.len()
    );

    let builder = UplinkBuilder::new(dev_addr, cli.fcnt, f_port, payload);
    let frame = builder.build(&keys)?;
    info!("Encoded {}-byte PHYPayload for DevAddr={}", frame.len(), dev_addr);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "dev_addr": dev_addr.to_string(),
                "fcnt": cli.fcnt,
                "f_port": f_port,
                "size": frame.len(),
                "phy_payload": hex::encode(&frame),
            })
        );
    } else {
        // Bare hex on stdout, ready for a transport or a hex-dump diff
        println!("{}", hex::encode(&frame));
    }

    Ok(())
}
