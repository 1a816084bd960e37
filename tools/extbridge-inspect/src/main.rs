// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! extbridge-inspect - Inspect extension interface descriptions
//!
//! Loads a JSON interface description without linking the native module and
//! prints its types, struct layouts and function signatures.
//!
//! # Usage
//!
//! ```bash
//! # List structs with size and member layout
//! extbridge-inspect geometry.json structs
//!
//! # Resolve a type name as an output parameter
//! extbridge-inspect geometry.json resolve Point --output
//!
//! # Decode a struct from hex bytes
//! extbridge-inspect geometry.json decode Point 0100000002000000
//!
//! # Function table as JSON
//! extbridge-inspect geometry.json --format json functions
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use extbridge::{
    load_module, DetachedModule, ExtensionModule, ModuleCatalog, ModuleDocument, Value,
};
use serde_json::json;

/// Inspect extension interface descriptions
#[derive(Parser, Debug)]
#[command(name = "extbridge-inspect")]
#[command(version)]
#[command(about = "Inspect extension types, struct layouts and signatures")]
struct Args {
    /// Interface description (JSON)
    file: PathBuf,

    /// Output format: pretty, json
    #[arg(short, long, default_value = "pretty", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List declared structs with their member layout
    Structs,

    /// List typedefs
    Typedefs,

    /// Resolve a type name to a descriptor
    Resolve {
        /// Type name
        name: String,

        /// Pointer depth
        #[arg(short, long, default_value = "0")]
        depth: usize,

        /// Resolve as an output parameter
        #[arg(short, long)]
        output: bool,
    },

    /// Decode a struct from hex-encoded bytes
    Decode {
        /// Struct name
        name: String,

        /// Bytes as hex, whitespace allowed
        hex: String,

        /// Byte offset of the struct in the buffer
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List the function table
    Functions,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(OutputFormat::Pretty),
            "json" | "j" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let doc = ModuleDocument::read(&args.file)?;

    // Inspection never calls into native code.
    let mut catalog = ModuleCatalog::new();
    catalog.register_module(doc.class.clone(), DetachedModule::create);
    let module = load_module(&doc, &catalog)?;
    log::info!(
        "loaded {} ({} typedefs, {} structs, {} functions)",
        module.name(),
        module.registry().typedef_count(),
        module.registry().struct_count(),
        module.functions().len()
    );

    match &args.command {
        Commands::Structs => cmd_structs(&module, &args.format),
        Commands::Typedefs => cmd_typedefs(&module, &args.format),
        Commands::Resolve {
            name,
            depth,
            output,
        } => cmd_resolve(&module, name, *depth, *output, &args.format),
        Commands::Decode { name, hex, offset } => {
            cmd_decode(&module, name, hex, *offset, &args.format)
        }
        Commands::Functions => cmd_functions(&module, &args.format),
    }
}

fn cmd_structs(
    module: &ExtensionModule,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = module.registry();
    let mut structs = Vec::new();
    for name in registry.struct_names() {
        if let Some(st) = registry.struct_type(name) {
            structs.push(st);
        }
    }

    match format {
        OutputFormat::Pretty => {
            println!(
                "{} {} struct(s) in {}",
                "Structs:".cyan().bold(),
                structs.len(),
                module.name()
            );
            for st in structs {
                println!();
                println!(
                    "  {} {}",
                    st.name().green().bold(),
                    format!(
                        "(class={}, size={}, align={})",
                        st.class_name(),
                        st.size(),
                        st.alignment()
                    )
                    .dimmed()
                );
                for member in st.members() {
                    let offset = st
                        .offset_of(member.name())
                        .map(|o| format!("@{:<4}", o))
                        .unwrap_or_else(|| " ".repeat(5));
                    println!(
                        "    {} {} {}",
                        offset.dimmed(),
                        member.descriptor(),
                        member.name()
                    );
                }
            }
        }
        OutputFormat::Json => {
            let out: Vec<_> = structs
                .iter()
                .map(|st| {
                    json!({
                        "name": st.name(),
                        "class": st.class_name(),
                        "size": st.size(),
                        "alignment": st.alignment(),
                        "members": st.members().iter().map(|m| json!({
                            "name": m.name(),
                            "type": m.descriptor().to_string(),
                            "offset": st.offset_of(m.name()),
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn cmd_typedefs(
    module: &ExtensionModule,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = module.registry();
    let typedefs: Vec<(&str, String)> = registry
        .typedef_names()
        .into_iter()
        .filter_map(|name| registry.typedef(name).map(|desc| (name, desc.to_string())))
        .collect();

    match format {
        OutputFormat::Pretty => {
            println!("{} {}", "Typedefs:".cyan().bold(), typedefs.len());
            for (name, desc) in typedefs {
                println!("  {} = {}", name.green(), desc);
            }
        }
        OutputFormat::Json => {
            let out: serde_json::Map<String, serde_json::Value> = typedefs
                .into_iter()
                .map(|(name, desc)| (name.to_string(), json!(desc)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn cmd_resolve(
    module: &ExtensionModule,
    name: &str,
    depth: usize,
    output: bool,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let desc = module.type_descriptor(name, depth, output)?;
    match format {
        OutputFormat::Pretty => {
            println!(
                "{}{} {} {}",
                name,
                "*".repeat(depth),
                "->".dimmed(),
                desc.to_string().green()
            );
            println!("    size={} align={}", desc.size(), desc.alignment());
        }
        OutputFormat::Json => {
            let out = json!({
                "name": name,
                "pointer_depth": depth,
                "output": output,
                "descriptor": desc.to_string(),
                "size": desc.size(),
                "alignment": desc.alignment(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn cmd_decode(
    module: &ExtensionModule,
    name: &str,
    hex: &str,
    offset: usize,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let st = module
        .struct_type(name)
        .ok_or_else(|| format!("unknown struct: {}", name))?;
    let data = parse_hex(hex)?;
    let value = st.unmarshal(&data, offset)?;

    match format {
        OutputFormat::Pretty => println!("{}", value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value_to_json(&value))?),
    }
    Ok(())
}

fn cmd_functions(
    module: &ExtensionModule,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Pretty => {
            println!(
                "{} {} function(s)",
                "Functions:".cyan().bold(),
                module.functions().len()
            );
            for (id, function) in module.functions().iter() {
                let signature = function
                    .signature()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                println!(
                    "  {} {}{}",
                    format!("[{}]", id).yellow(),
                    function.name().green(),
                    signature
                );
            }
        }
        OutputFormat::Json => {
            let out: Vec<_> = module
                .functions()
                .iter()
                .map(|(id, function)| {
                    json!({
                        "id": id,
                        "name": function.name(),
                        "signature": function.signature().map(|s| s.to_string()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn parse_hex(hex: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = hex
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits: {}", digits.len()));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(text, 16).map_err(|_| format!("invalid hex byte: {}", text))
        })
        .collect()
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(v) => json!(v),
        Value::Char(v) => json!(v),
        Value::Float(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Address(v) => json!(format!("0x{:08x}", v)),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Struct(s) => {
            let fields: serde_json::Map<String, serde_json::Value> = s
                .fields()
                .map(|(name, v)| (name.to_string(), value_to_json(v)))
                .collect();
            json!({ "type": s.type_name(), "fields": fields })
        }
        Value::Void => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("01 ff\n0a"), Ok(vec![0x01, 0xff, 0x0a]));
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_value_to_json() {
        let value = Value::Array(vec![Value::Int(1), Value::Address(16), Value::Void]);
        assert_eq!(value_to_json(&value), json!([1, "0x00000010", null]));
    }

    #[test]
    fn test_output_format() {
        assert!(matches!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
