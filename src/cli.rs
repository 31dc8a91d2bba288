//! CLI интерфейс для txsim
//!
//! Предоставляет командную строку для прогона последовательностей через
//! планировщики и сравнения протоколов между собой.

use crate::common::{OutputFormat, SimulatorConfig};
use crate::core::{simulate, Protocol, SimulationReport};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// txsim - симулятор протоколов управления конкурентностью транзакций
#[derive(Parser)]
#[command(name = "txsim")]
#[command(about = "txsim - 2PL (wait-die), OCC and MVCC transaction scheduler simulator")]
#[command(version)]
pub struct Cli {
    /// Конфигурационный файл
    #[arg(short, long, value_name = "CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Уровень детализации логирования
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Прогнать последовательность через один протокол
    Run {
        /// Протокол (2pl, occ, mvcc)
        #[arg(short, long)]
        protocol: Option<String>,

        /// Формат вывода (text, json)
        #[arg(short, long)]
        format: Option<String>,

        #[command(flatten)]
        input: SequenceInput,
    },

    /// Прогнать последовательность через все три протокола
    Compare {
        /// Формат вывода (text, json)
        #[arg(short, long)]
        format: Option<String>,

        #[command(flatten)]
        input: SequenceInput,
    },

    /// Показать информацию о системе и настройках
    Info,
}

/// Источник последовательности: аргумент или файл
#[derive(Args)]
pub struct SequenceInput {
    /// Последовательность вида "R1(X);R2(X);W1(X);C1;C2"
    #[arg(required_unless_present = "file")]
    pub sequence: Option<String>,

    /// Файл с последовательностью
    #[arg(long, value_name = "PATH", conflicts_with = "sequence")]
    pub file: Option<PathBuf>,
}

impl SequenceInput {
    /// Читает последовательность
    pub fn read(&self) -> anyhow::Result<String> {
        match (&self.sequence, &self.file) {
            (Some(sequence), _) => Ok(sequence.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read sequence from {}", path.display())),
            (None, None) => bail!("no sequence given"),
        }
    }
}

impl Cli {
    /// Разбирает аргументы командной строки
    pub fn init() -> Self {
        Self::parse()
    }

    /// Загружает конфигурацию и применяет к ней флаги командной строки
    pub fn load_config(&self) -> anyhow::Result<SimulatorConfig> {
        let mut config = SimulatorConfig::load(self.config.as_deref())?;

        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
            config.level_filter()?;
        }

        Ok(config)
    }

    /// Выполняет команду
    pub fn execute(&self, config: &SimulatorConfig, out: &mut dyn Write) -> anyhow::Result<()> {
        match &self.command {
            Some(Commands::Run {
                protocol,
                format,
                input,
            }) => {
                let protocol = match protocol {
                    Some(protocol) => protocol.parse()?,
                    None => config.protocol,
                };
                let format = resolve_format(format.as_deref(), config)?;
                let report = simulate(protocol, &input.read()?)?;
                write_reports(out, std::slice::from_ref(&report), format, config)
            }
            Some(Commands::Compare { format, input }) => {
                let format = resolve_format(format.as_deref(), config)?;
                let sequence = input.read()?;
                let reports = Protocol::ALL[..]
                    .par_iter()
                    .map(|protocol| simulate(*protocol, &sequence))
                    .collect::<crate::common::Result<Vec<_>>>()?;
                write_reports(out, &reports, format, config)
            }
            Some(Commands::Info) => self.show_info(config, out),
            None => {
                writeln!(out, "txsim {}", env!("CARGO_PKG_VERSION"))?;
                writeln!(out, "Use --help for usage")?;
                Ok(())
            }
        }
    }

    /// Показывает информацию о системе
    fn show_info(&self, config: &SimulatorConfig, out: &mut dyn Write) -> anyhow::Result<()> {
        writeln!(out, "txsim {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "Protocols:")?;
        for protocol in Protocol::ALL {
            writeln!(out, "  {:<5} {}", protocol, protocol.name())?;
        }
        writeln!(out, "Default protocol: {}", config.protocol)?;
        writeln!(out, "Output format: {}", config.output)?;
        writeln!(out, "Log level: {}", config.log_level)?;
        Ok(())
    }
}

fn resolve_format(flag: Option<&str>, config: &SimulatorConfig) -> anyhow::Result<OutputFormat> {
    Ok(match flag {
        Some(format) => format.parse()?,
        None => config.output,
    })
}

fn write_reports(
    out: &mut dyn Write,
    reports: &[SimulationReport],
    format: OutputFormat,
    config: &SimulatorConfig,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for report in reports {
                write!(out, "{}", report.to_text())?;
            }
        }
        OutputFormat::Json => {
            let json = match reports {
                [report] => report.to_json(config.pretty_json)?,
                _ if config.pretty_json => serde_json::to_string_pretty(reports)?,
                _ => serde_json::to_string(reports)?,
            };
            writeln!(out, "{}", json)?;
        }
    }
    Ok(())
}
