//! CLI: node-types.json → (type model | token name table)
use std::path::{Path, PathBuf};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, Args};
use colored::Colorize;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use tracing::info;

use nodetype_gen::custom::CustomMethodsConfig;
use nodetype_gen::grammar::Grammar;
use nodetype_gen::naming::token::TokenNameTable;
use nodetype_gen::path_de;
use nodetype_gen::pipeline::{self, GenConfig};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// resolve tree-sitter node types into a typed class hierarchy with hoisted common methods
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve each grammar and print the type model as JSON
    Generate(GenerateOut),
    /// print a token name table covering every token of a grammar
    Tokens(TokensOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more node-types.json files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct ConfigSettings {
    /// JSON config file; the flags below override its entries
    #[arg(long)]
    config: Option<PathBuf>,

    /// package of the generated types
    #[arg(long)]
    package: Option<String>,

    /// class name pattern, e.g. 'Ts{node}'
    #[arg(long)]
    type_name_pattern: Option<String>,

    /// JSON token name table; must cover every token
    #[arg(long)]
    token_names: Option<PathBuf>,

    /// JSON object mapping unknown type names to known ones
    #[arg(long)]
    fallback_node_types: Option<PathBuf>,

    /// JSON custom methods config
    #[arg(long)]
    custom_methods: Option<PathBuf>,

    /// root node type, for grammars that do not mark one
    #[arg(long)]
    root_node: Option<String>,

    /// qualified name of a nullable annotation (default: java.util.Optional)
    #[arg(long)]
    nullable_annotation: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    config_settings: ConfigSettings,

    /// output directory, one `<name>.types.json` per input (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct TokensOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ConfigSettings {
    fn load(&self) -> anyhow::Result<GenConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => GenConfig::load(path)
                .with_context(|| format!("failed to load config file ({})", path.display()))?,
            None => GenConfig::default(),
        };
        if let Some(package) = self.package.as_ref() {
            config.package = package.clone();
        }
        if let Some(pattern) = self.type_name_pattern.as_ref() {
            config.type_name_pattern = Some(pattern.clone());
        }
        if let Some(path) = self.token_names.as_ref() {
            config.token_names = Some(load_json::<TokenNameTable>(path)?);
        }
        if let Some(path) = self.fallback_node_types.as_ref() {
            config.fallback_node_types = load_json::<IndexMap<String, String>>(path)?;
        }
        if let Some(path) = self.custom_methods.as_ref() {
            config.custom_methods = load_json::<CustomMethodsConfig>(path)?;
        }
        if let Some(root) = self.root_node.as_ref() {
            config.root_node = Some(root.clone());
        }
        if let Some(annotation) = self.nullable_annotation.as_ref() {
            config.nullable_annotation = Some(annotation.clone());
        }
        Ok(config)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(())
                }
                let config = target.config_settings.load()?;
                let source_paths = resolve_file_path_patterns(&target.input_settings.input)?;

                // grammars are independent, each run owns its state
                let results = source_paths
                    .par_iter()
                    .map(|path| generate_file(path, &config).map(|src| (path, src)))
                    .collect::<Vec<_>>();

                let mut failed = 0;
                for result in results {
                    match result {
                        Ok((path, src)) => write_output(path, &src, target.out.as_deref())?,
                        Err(error) => {
                            failed += 1;
                            eprintln!("{} {error:#}", "✗".red().bold());
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} grammars failed", source_paths.len())
                }
                info!(grammars = source_paths.len(), "done");
                Ok(())
            }
            Command::Tokens(target) => {
                let source_paths = resolve_file_path_patterns(&target.input_settings.input)?;
                let mut table = TokenNameTable::new();
                for path in &source_paths {
                    let grammar = Grammar::load(path)
                        .with_context(|| format!("failed to load grammar ({})", path.display()))?;
                    for (parent, fields) in pipeline::token_table_skeleton(&grammar) {
                        let entry = table.entry(parent).or_default();
                        for (field, tokens) in fields {
                            entry.entry(field).or_default().extend(tokens);
                        }
                    }
                }
                let table_src = serde_json::to_string_pretty(&table)?;
                match target.out.as_ref() {
                    Some(out) => write_file(out, &table_src)?,
                    None => println!("{table_src}"),
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn generate_file(path: &Path, config: &GenConfig) -> anyhow::Result<String> {
    let path_str = path.display();
    let grammar = Grammar::load(path).with_context(|| format!("failed to load grammar ({path_str})"))?;
    let model = pipeline::generate(&grammar, config).with_context(|| format!("failed to resolve grammar ({path_str})"))?;
    Ok(serde_json::to_string_pretty(&model)?)
}

fn write_output(source_path: &Path, src: &str, out_dir: Option<&Path>) -> anyhow::Result<()> {
    let Some(out_dir) = out_dir else {
        println!("{src}");
        return Ok(())
    };
    let stem = source_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "node-types".to_string());
    let out = out_dir.join(format!("{stem}.types.json"));
    write_file(&out, src)?;
    eprintln!("{} {}", "✓".green().bold(), out.display());
    Ok(())
}

fn write_file(out: &Path, src: &str) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    path_de::from_slice_with_path(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
