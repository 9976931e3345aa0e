//! Defect CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{colorize_criticality, list_table, render_list};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{
    Criticality, Defect, DefectCounts, DefectFilter, DefectGeometry, DefectId, DefectType,
    NewDefect, PhotoId, SeverityFlags,
};

#[derive(Args, Debug)]
pub struct DefectArgs {
    #[command(subcommand)]
    pub command: DefectCommands,
}

#[derive(Subcommand, Debug)]
pub enum DefectCommands {
    /// Record a detection
    Add {
        /// Defect type (see `beltmon defect types`)
        defect_type: String,
        /// Photo file to store alongside the defect
        #[arg(long, conflicts_with = "photo_id")]
        photo: Option<PathBuf>,
        /// Existing photo id (a capture may hold several defects)
        #[arg(long)]
        photo_id: Option<PhotoId>,
        /// Bounding box width, mm
        #[arg(long, default_value_t = 0)]
        width: u32,
        /// Bounding box length, mm
        #[arg(long, default_value_t = 0)]
        length: u32,
        /// Position along the belt, mm
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        longitudinal: i64,
        /// Position across the belt, mm
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        transverse: i64,
        /// Detector confidence (0-100)
        #[arg(long, default_value_t = 100)]
        probability: u8,
        /// Mark as extreme
        #[arg(long)]
        extreme: bool,
        /// Mark as critical (wins over --extreme)
        #[arg(long)]
        critical: bool,
        /// Classify, log and recompute the conveyor status right away
        #[arg(long)]
        process: bool,
    },
    /// List defects
    List {
        /// Filter by defect type
        #[arg(short = 't', long = "type")]
        defect_type: Option<String>,
        /// Filter by criticality (normal, extreme, critical)
        #[arg(short, long)]
        criticality: Option<String>,
        /// Detected at or after (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Detected at or before (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
    /// Show defect details
    Show {
        /// Defect ID
        id: DefectId,
    },
    /// Count defects per severity class
    Count,
    /// List known defect types
    Types,
    /// Change the severity flags of a defect
    SetCriticality {
        /// Defect ID
        id: DefectId,
        #[arg(long)]
        extreme: bool,
        #[arg(long)]
        critical: bool,
    },
    /// Delete a defect, repairing its variation chain
    Delete {
        /// Defect ID
        id: DefectId,
    },
}

#[derive(Debug, Serialize)]
pub struct DefectOutput {
    pub id: DefectId,
    pub defect_type: String,
    pub criticality: String,
    pub is_extreme: bool,
    pub is_critical: bool,
    pub probability: u8,
    pub box_width_mm: u32,
    pub box_length_mm: u32,
    pub longitudinal_position_mm: i64,
    pub transverse_position_mm: i64,
    pub photo_id: PhotoId,
    pub detected_at: String,
    #[serde(skip)]
    level: Criticality,
}

impl From<&Defect> for DefectOutput {
    fn from(defect: &Defect) -> Self {
        Self {
            id: defect.id,
            defect_type: defect.defect_type.as_str().to_string(),
            criticality: defect.criticality().as_str().to_string(),
            is_extreme: defect.severity.is_extreme(),
            is_critical: defect.severity.is_critical(),
            probability: defect.probability,
            box_width_mm: defect.geometry.box_width_mm,
            box_length_mm: defect.geometry.box_length_mm,
            longitudinal_position_mm: defect.geometry.longitudinal_position_mm,
            transverse_position_mm: defect.geometry.transverse_position_mm,
            photo_id: defect.photo_id,
            detected_at: defect.detected_at.to_rfc3339(),
            level: defect.criticality(),
        }
    }
}

impl DefectOutput {
    fn detail_lines(&self) -> Vec<String> {
        vec![
            format!("Defect: {}", self.id),
            format!("Type: {}", self.defect_type),
            format!("Criticality: {}", colorize_criticality(self.level)),
            format!("Probability: {}%", self.probability),
            format!("Box: {} x {} mm", self.box_width_mm, self.box_length_mm),
            format!(
                "Position: {} mm along, {} mm across",
                self.longitudinal_position_mm, self.transverse_position_mm
            ),
            format!("Photo: {}", self.photo_id),
            format!("Detected: {}", self.detected_at),
        ]
    }
}

impl CommandOutput for DefectOutput {
    fn to_human(&self) -> String {
        self.detail_lines().join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct DefectListOutput {
    pub defects: Vec<DefectOutput>,
    pub total: usize,
}

impl DefectListOutput {
    pub fn new(defects: &[Defect]) -> Self {
        Self {
            defects: defects.iter().map(DefectOutput::from).collect(),
            total: defects.len(),
        }
    }
}

impl CommandOutput for DefectListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "type", "criticality", "prob", "position", "size", "detected"]);
        for d in &self.defects {
            table.add_row(vec![
                d.id.to_string(),
                d.defect_type.clone(),
                colorize_criticality(d.level).to_string(),
                format!("{}%", d.probability),
                format!("{}/{}", d.longitudinal_position_mm, d.transverse_position_mm),
                format!("{}x{}", d.box_width_mm, d.box_length_mm),
                d.detected_at.clone(),
            ]);
        }
        render_list("defect", &table, self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct CountOutput {
    #[serde(flatten)]
    pub counts: DefectCounts,
}

impl CommandOutput for CountOutput {
    fn to_human(&self) -> String {
        format!(
            "Total: {}\nExtreme: {}\nCritical: {}",
            self.counts.total, self.counts.extreme, self.counts.critical
        )
    }
}

#[derive(Debug, Serialize)]
pub struct TypesOutput {
    pub types: Vec<&'static str>,
}

impl CommandOutput for TypesOutput {
    fn to_human(&self) -> String {
        self.types.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct DefectActionOutput {
    pub success: bool,
    pub message: String,
    pub changed: Option<bool>,
    pub defect: DefectOutput,
}

impl CommandOutput for DefectActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

pub(crate) fn parse_defect_type(s: &str) -> Result<DefectType> {
    DefectType::parse_str(s).ok_or_else(|| {
        let known: Vec<&str> = DefectType::ALL.iter().map(DefectType::as_str).collect();
        anyhow::anyhow!("Invalid defect type: {s}. Known types: {}", known.join(", "))
    })
}

pub(crate) fn parse_criticality(s: &str) -> Result<Criticality> {
    Criticality::parse_str(s)
        .ok_or_else(|| anyhow::anyhow!("Invalid criticality: {s}. Must be one of: normal, extreme, critical"))
}

pub async fn execute(args: DefectArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.defects;

    match args.command {
        DefectCommands::Add {
            defect_type,
            photo,
            photo_id,
            width,
            length,
            longitudinal,
            transverse,
            probability,
            extreme,
            critical,
            process,
        } => {
            let defect_type = parse_defect_type(&defect_type)?;
            let photo_id = match (photo, photo_id) {
                (_, Some(id)) => id,
                (Some(path), None) => {
                    let image = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read photo {}", path.display()))?;
                    service.store_photo(image).await?.id
                }
                (None, None) => anyhow::bail!("Either --photo or --photo-id is required"),
            };

            let geometry = DefectGeometry {
                box_width_mm: width,
                box_length_mm: length,
                longitudinal_position_mm: longitudinal,
                transverse_position_mm: transverse,
            };
            let new_defect = NewDefect::new(defect_type, geometry, photo_id)
                .with_probability(probability)
                .with_severity(SeverityFlags::new(extreme, critical));

            let mut defect = service.record_detection(new_defect).await?;
            let mut message = format!("Recorded defect {} ({})", defect.id, defect.defect_type);
            if process {
                let report = service.process_detection(defect.id).await?;
                message.push_str(&format!(
                    "\nConveyor status: {}",
                    colorize_criticality(report.status.criticality())
                ));
                defect = report.defect;
            }

            output(
                &DefectActionOutput {
                    success: true,
                    message,
                    changed: None,
                    defect: DefectOutput::from(&defect),
                },
                json_mode,
            );
        }
        DefectCommands::List { defect_type, criticality, from, to } => {
            let filter = DefectFilter {
                defect_type: defect_type.as_deref().map(parse_defect_type).transpose()?,
                criticality: criticality.as_deref().map(parse_criticality).transpose()?,
                detected_from: from,
                detected_to: to,
            };
            let defects = service.list_defects(&filter).await?;
            output(&DefectListOutput::new(&defects), json_mode);
        }
        DefectCommands::Show { id } => {
            let defect = service.get_defect(id).await?;
            output(&DefectOutput::from(&defect), json_mode);
        }
        DefectCommands::Count => {
            let counts = service.count_defects().await?;
            output(&CountOutput { counts }, json_mode);
        }
        DefectCommands::Types => {
            let types = service.defect_types().iter().map(DefectType::as_str).collect();
            output(&TypesOutput { types }, json_mode);
        }
        DefectCommands::SetCriticality { id, extreme, critical } => {
            let (defect, changed) = service.set_defect_criticality(id, extreme, critical).await?;
            let message = if changed {
                format!("Defect {id} is now {}", colorize_criticality(defect.criticality()))
            } else {
                format!("Defect {id} is already {}", colorize_criticality(defect.criticality()))
            };
            output(
                &DefectActionOutput {
                    success: true,
                    message,
                    changed: Some(changed),
                    defect: DefectOutput::from(&defect),
                },
                json_mode,
            );
        }
        DefectCommands::Delete { id } => {
            let defect = service.delete_defect(id).await?;
            output(
                &DefectActionOutput {
                    success: true,
                    message: format!("Defect {id} deleted"),
                    changed: None,
                    defect: DefectOutput::from(&defect),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
