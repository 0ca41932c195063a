//! `dwarf2btf`: reads an ELF file's DWARF debug info and either emits raw
//! BTF bytes into a `.BTF`-named in-memory section (`--emit`) or dumps a
//! human-readable listing of every translated type (the default).

use std::io::Write;

use btfgen::gimli_die;
use btfgen::{BtfResult, Context, VecSink};
use clap::Parser;

#[derive(Parser)]
#[command(about = "Translate DWARF type info into BTF")]
struct Cli {
    /// ELF file containing DWARF debug info
    file_path: String,

    /// Write raw BTF bytes to this path instead of dumping a listing
    #[arg(long)]
    emit: Option<String>,
}

fn main() -> BtfResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let source = gimli_die::load(&cli.file_path)?;

    let mut ctx = Context::new();
    for unit in &source.units {
        ctx.add_compile_unit(unit.root())?;
    }
    ctx.finish()?;

    match cli.emit {
        Some(path) => {
            let mut sink = VecSink::new();
            ctx.emit(&mut sink, ".BTF")?;
            let bytes = sink.section(".BTF").expect("just emitted");
            std::fs::File::create(&path)?.write_all(bytes)?;
        }
        None => {
            print!("{}", ctx.show_all()?);
        }
    }

    Ok(())
}
