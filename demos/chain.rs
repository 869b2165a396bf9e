use clap::{Parser, ValueEnum};

use sparse_rs::config::{BuildConfig, RowEncoding};
use sparse_rs::export::{export_matrix, ExportTarget};
use sparse_rs::odd::Odd;
use sparse_rs::relation::Relation;
use sparse_rs::slot::MatrixSlot;
use sparse_rs::symbolic::MatrixBuilder;
use sparse_rs::types::VarOrder;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Encoding {
    Auto,
    Counts,
    Starts,
}

impl From<Encoding> for RowEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Auto => RowEncoding::Auto,
            Encoding::Counts => RowEncoding::Counts,
            Encoding::Starts => RowEncoding::Starts,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of states in the chain.
    #[arg(value_name = "INT", default_value = "1000")]
    n: u64,

    /// Probability of moving forward.
    #[clap(long, value_name = "FLOAT", default_value = "0.5")]
    p: f64,

    /// Disable the compact (dictionary) form.
    #[clap(long)]
    no_compact: bool,

    /// Width of a packed column entry, in bits.
    #[clap(long, value_name = "INT", default_value = "32")]
    column_bits: u32,

    /// Row-length encoding.
    #[clap(long, value_enum, default_value = "auto")]
    row_encoding: Encoding,

    /// Export the matrix to this `.tra` file (logged if omitted).
    #[clap(long, value_name = "FILE")]
    output: Option<std::path::PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);
    if args.n == 0 {
        color_eyre::eyre::bail!("the chain needs at least one state");
    }

    // Interleaved row/column variables: x1 x2 | x3 x4 | ...
    let bits = (64 - args.n.saturating_sub(1).leading_zeros()).max(1);
    let rows = VarOrder::from_ids((0..bits).map(|i| 2 * i + 1));
    let cols = VarOrder::from_ids((0..bits).map(|i| 2 * i + 2));
    let odd = Odd::new(bits as usize, 0..args.n);
    println!("{} states over {} bits", odd.num_states(), bits);

    // Random walk to the right; the last state is absorbing.
    let mut transitions = vec![];
    for s in 0..args.n {
        if s + 1 < args.n {
            transitions.push((s, s + 1, args.p));
            transitions.push((s, s, 1.0 - args.p));
        } else {
            transitions.push((s, s, 1.0));
        }
    }
    let trans = Relation::from_transitions(&rows, &cols, transitions);

    let config = BuildConfig::default()
        .with_compact(!args.no_compact)
        .with_column_bits(args.column_bits)
        .with_row_encoding(args.row_encoding.into());
    let builder = MatrixBuilder::new(&rows, &cols, &odd).config(config);

    let slot = MatrixSlot::new();
    let time_build = std::time::Instant::now();
    let matrix = slot.build(&builder, &trans)?;
    println!("matrix = {:?}", matrix);
    println!("Built in {:.3} s", time_build.elapsed().as_secs_f64());

    let last = odd.num_states() - 1;
    println!("final({}) = {}", last, slot.is_final_state(last)?);
    let walk: Vec<usize> = (0..odd.num_states().min(4)).collect();
    println!("P{:?} = {}", walk, matrix.path_prob(&walk)?);

    let mut target = match &args.output {
        Some(path) => ExportTarget::file(path)?,
        None => ExportTarget::Log,
    };
    export_matrix(&matrix, &mut target)?;
    slot.free();

    println!("Total time: {:.3} s", time_total.elapsed().as_secs_f64());

    Ok(())
}
