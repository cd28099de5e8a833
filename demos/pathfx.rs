//! Very simple tool that applies a path effect to an SVG path and prints the result
#![deny(warnings)]

use pathfx::*;
use std::{env, fs::File, io::Read, result::Result};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

type Error = Box<dyn std::error::Error>;

#[derive(Debug)]
struct Args {
    effect: String,
    input_file: String,
    params: Vec<(String, String)>,
    aux: Vec<(String, String)>,
    knots: bool,
    indicators: bool,
}

fn split_assignment(arg: &str) -> Result<(String, String), Error> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value: {}", arg))?;
    Ok((key.to_owned(), value.to_owned()))
}

impl Args {
    fn parse() -> Result<Args, Error> {
        let mut result = Args {
            effect: String::new(),
            input_file: String::new(),
            params: Vec::new(),
            aux: Vec::new(),
            knots: false,
            indicators: false,
        };
        let mut positional = 0;
        let mut args = env::args();
        let cmd = args.next().unwrap_or_else(|| "pathfx".to_owned());
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-h" => {
                    positional = 0;
                    break;
                }
                "-l" => {
                    for effect_type in EffectType::ALL {
                        if Effect::new(*effect_type).is_ok() {
                            println!("{}", effect_type);
                        }
                    }
                    std::process::exit(0);
                }
                "-p" => {
                    let param = args.next().ok_or("-p requires key=value argument")?;
                    result.params.push(split_assignment(&param)?);
                }
                "-a" => {
                    let aux = args.next().ok_or("-a requires key=file argument")?;
                    result.aux.push(split_assignment(&aux)?);
                }
                "-k" => result.knots = true,
                "-i" => result.indicators = true,
                _ => {
                    positional += 1;
                    match positional {
                        1 => result.effect = arg,
                        2 => result.input_file = arg,
                        _ => return Err("unexpected positional argment".into()),
                    }
                }
            }
        }
        if positional < 2 {
            eprintln!("Very simple tool that applies a path effect to an SVG path");
            eprintln!("\nUSAGE:");
            eprintln!(
                "    {} [-l] [-p <key=value>].. [-a <key=file>].. [-k] [-i] <effect> <file.path>",
                cmd
            );
            eprintln!("\nARGS:");
            eprintln!("    -l                 list available effects");
            eprintln!("    -p <key=value>     set effect parameter");
            eprintln!("    -a <key=file>      referenced path used by the effect");
            eprintln!("    -k                 print knots to stderr");
            eprintln!("    -i                 print indicator paths to stderr");
            eprintln!("    <effect>           effect key");
            eprintln!("    <file.path>        file containing SVG path ('-' means stdin)");
            std::process::exit(1);
        }
        Ok(result)
    }
}

/// Load path for the file
fn path_load(path: &str) -> Result<Path, Error> {
    let mut contents = String::new();
    if path != "-" {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    } else {
        std::io::stdin().read_to_string(&mut contents)?;
    }
    Ok(tracing::debug_span!("[parse]").in_scope(|| contents.parse())?)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    let effect_type = EffectType::from_key(&args.effect)
        .ok_or_else(|| format!("unknown effect: {}", args.effect))?;

    let mut aux = AuxInputs::default();
    for (key, file) in args.aux.iter() {
        aux = aux.with_path(key.clone(), Some(path_load(file)?));
    }
    let input = EffectInput {
        aux,
        ..EffectInput::new(path_load(&args.input_file)?)
    };
    tracing::debug!("[path:segments_count] {}", input.path.segments_count());

    let mut effect = Effect::new(effect_type)?;
    effect.on_apply(&input);
    for (key, value) in args.params.iter() {
        effect.set_param(key, value)?;
    }

    let env = Environment::default();
    let output = effect.apply(&input, &env);
    if let Outcome::Unchanged(reason) = &output.outcome {
        eprintln!("effect did not apply: {}", reason);
    }
    if args.knots {
        for (name, point) in effect.knots(&input) {
            eprintln!("knot {}: {:?}", name, point);
        }
    }
    if args.indicators {
        for indicator in output.indicators.iter() {
            eprintln!("indicator: {}", indicator.to_svg_path());
        }
    }
    println!("{}", output.path.to_svg_path());

    Ok(())
}
