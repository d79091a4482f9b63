use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tr31::{generate_kbpk, Header, KeyBlock, Version};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;


#[derive(Clone, Debug, Eq, Hash, Ord, Parser, PartialEq, PartialOrd)]
enum Mode {
    /// Wraps a key into a key block.
    Wrap(WrapOpts),

    /// Unwraps a key from a key block.
    Unwrap(UnwrapOpts),

    /// Shows the header of a key block without unwrapping it.
    Inspect(InspectOpts),

    /// Generates a random key block protection key.
    GenerateKbpk(GenerateKbpkOpts),
}
impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Self::Wrap(_) => "wrap",
            Self::Unwrap(_) => "unwrap",
            Self::Inspect(_) => "inspect",
            Self::GenerateKbpk(_) => "generate-kbpk",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, Hash, Ord, Parser, PartialEq, PartialOrd)]
struct WrapOpts {
    /// Key block protection key as hex.
    #[arg(short, long, env = "TR31_KBPK", hide_env_values = true)]
    pub kbpk: String,

    /// Header template; its length field is recalculated.
    #[arg(short = 'H', long, default_value = "B0000P0TE00N0000")]
    pub header: String,

    /// Optional block as ID=VALUE; may be given multiple times.
    #[arg(short, long = "block")]
    pub blocks: Vec<String>,

    /// Length to which the key is masked with random padding.
    #[arg(short, long)]
    pub masked_key_len: Option<usize>,

    /// Key to wrap as hex.
    pub key: String,
}

#[derive(Clone, Debug, Default, Eq, Hash, Ord, Parser, PartialEq, PartialOrd)]
struct UnwrapOpts {
    /// Key block protection key as hex.
    #[arg(short, long, env = "TR31_KBPK", hide_env_values = true)]
    pub kbpk: String,

    pub key_block: String,
}

#[derive(Clone, Debug, Default, Eq, Hash, Ord, Parser, PartialEq, PartialOrd)]
struct InspectOpts {
    pub key_block: String,
}

#[derive(Clone, Debug, Eq, Hash, Ord, Parser, PartialEq, PartialOrd)]
struct GenerateKbpkOpts {
    /// Key block version the KBPK will protect.
    #[arg(short, long = "version", default_value = "B")]
    pub version_id: Version,

    /// KBPK length in bytes.
    #[arg(short, long, default_value = "16")]
    pub length: usize,
}


fn decode_hex(what: &str, value: &str) -> Result<Zeroizing<Vec<u8>>, String> {
    hex::decode(value.trim())
        .map(Zeroizing::new)
        .map_err(|e| format!("{} is not valid hex: {}", what, e))
}

fn print_header(header: &Header, length: Option<&str>) {
    println!("version ID:     {}", header.version_id());
    if let Some(length) = length {
        println!("length:         {}", length);
    }
    println!("key usage:      {}", header.key_usage());
    println!("algorithm:      {}", header.algorithm());
    println!("mode of use:    {}", header.mode_of_use());
    println!("version number: {}", header.version_num());
    println!("exportability:  {}", header.exportability());
    println!("blocks:         {}", header.blocks().len());
    for (block_id, data) in header.blocks().iter() {
        println!("  {}: {}", block_id, data);
    }
}


fn run(mode: Mode) -> Result<(), Box<dyn Error>> {
    match mode {
        Mode::Wrap(opts) => {
            let kbpk = decode_hex("KBPK", &opts.kbpk)?;
            let key = decode_hex("key", &opts.key)?;

            let mut header: Header = opts.header.parse()?;
            for block in &opts.blocks {
                let Some((block_id, data)) = block.split_once('=') else {
                    return Err(format!("block {:?} must be given as ID=VALUE", block).into());
                };
                header.blocks_mut().set(block_id, data)?;
            }

            let key_block = KeyBlock::new(&kbpk, header);
            println!("{}", key_block.wrap(&key, opts.masked_key_len)?);
        },
        Mode::Unwrap(opts) => {
            let kbpk = decode_hex("KBPK", &opts.kbpk)?;
            let key_block = opts.key_block.trim();

            let unwrapped = KeyBlock::from_key_block(&kbpk, key_block)?
                .unwrap(key_block)?;
            print_header(&unwrapped.header, key_block.get(1..5));
            let key_hex = Zeroizing::new(hex::encode_upper(&*unwrapped.key));
            println!("key:            {}", key_hex.as_str());
        },
        Mode::Inspect(opts) => {
            let key_block = opts.key_block.trim();
            let (header, header_len) = Header::parse(key_block)?;
            print_header(&header, key_block.get(1..5));
            println!("header length:  {}", header_len);
        },
        Mode::GenerateKbpk(opts) => {
            let kbpk = generate_kbpk(opts.version_id, opts.length)?;
            let kbpk_hex = Zeroizing::new(hex::encode_upper(&*kbpk));
            println!("{}", kbpk_hex.as_str());
        },
    }
    Ok(())
}


fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mode = Mode::parse();
    // the options carry key material; only log the mode
    debug!(mode = mode.name(), "starting");

    match run(mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        },
    }
}
