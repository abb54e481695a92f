use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dept_timetabler::parser::{load_config_or_default, load_snapshot_from_dir, validate_snapshot};
use dept_timetabler::reporter::{
    generate_json_summary, generate_reports, generate_section_report, generate_teacher_report,
    print_summary, OutputFormat,
};
use dept_timetabler::scheduler::{generate_timetables, GenerateOptions};
use dept_timetabler::store::ScheduleStore;
use dept_timetabler::types::{
    RefinerKind, SectionId, TeacherId, Term, Timetable,
};
use dept_timetabler::validator::validate_store;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dept-timetabler")]
#[command(about = "Constraint-based university department timetable generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run demo with sample data
    Demo {
        /// Seed for the schedule generator
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Generate timetables from input data
    Generate {
        /// Directory containing input JSON files
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory for timetable files
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Academic term to schedule
        #[arg(short, long, value_parser = parse_term)]
        term: Term,

        /// Academic year label, e.g. 2025-26
        #[arg(short = 'y', long, default_value = "2025-26")]
        year: String,

        /// Seed for the schedule generator
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Run the metaheuristic refiner on residual conflicts
        #[arg(long)]
        refine: bool,

        /// Refiner driver: evolutionary or swarm
        #[arg(long)]
        refiner: Option<String>,

        /// Output format(s): json, markdown, text, or all
        #[arg(short, long, default_value = "all")]
        format: String,

        /// Suppress progress output, print JSON summary only
        #[arg(short, long)]
        quiet: bool,

        /// Only save if the findings count does not regress
        #[arg(long)]
        monotonic: bool,
    },

    /// Validate an existing timetable set
    Validate {
        /// Path to timetables.json
        #[arg(short, long)]
        schedule: PathBuf,

        /// Directory containing input data for validation
        #[arg(short, long)]
        data: PathBuf,

        /// Show every finding
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate reports from an existing timetable set
    Report {
        /// Path to timetables.json
        #[arg(short, long)]
        schedule: PathBuf,

        /// Directory containing input data
        #[arg(short, long)]
        data: PathBuf,

        /// Report for one section ID
        #[arg(long)]
        section: Option<String>,

        /// Report for one teacher ID
        #[arg(long)]
        teacher: Option<String>,
    },
}

fn parse_term(s: &str) -> std::result::Result<Term, String> {
    match s.to_ascii_lowercase().as_str() {
        "odd" => Ok(Term::Odd),
        "even" => Ok(Term::Even),
        other => Err(format!("expected 'odd' or 'even', got '{other}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { seed } => run_demo(seed),
        Commands::Generate {
            data,
            output,
            term,
            year,
            seed,
            refine,
            refiner,
            format,
            quiet,
            monotonic,
        } => run_generate(
            &data, &output, term, &year, seed, refine, refiner, &format, quiet, monotonic,
        ),
        Commands::Validate {
            schedule,
            data,
            verbose,
        } => run_validate(&schedule, &data, verbose),
        Commands::Report {
            schedule,
            data,
            section,
            teacher,
        } => run_report(&schedule, &data, section, teacher),
    }
}

fn run_demo(seed: u64) -> Result<()> {
    println!("{}", "Department Timetabler Demo".bold().cyan());
    println!("{}", "─".repeat(40));

    let demo_path = PathBuf::from("data/demo");
    let output_path = PathBuf::from("output");

    if !demo_path.join("sections.json").exists() {
        println!("{}", "Demo data not found. Creating sample data...".yellow());
        create_demo_data(&demo_path)?;
    }

    run_generate(
        &demo_path,
        &output_path,
        Term::Odd,
        "2025-26",
        seed,
        true,
        None,
        "all",
        false,
        false,
    )
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    data: &PathBuf,
    output: &PathBuf,
    term: Term,
    year: &str,
    seed: u64,
    refine: bool,
    refiner: Option<String>,
    format: &str,
    quiet: bool,
    monotonic: bool,
) -> Result<()> {
    let snapshot = load_snapshot_from_dir(data).context("Failed to load input data")?;

    let validation_result = validate_snapshot(&snapshot)?;
    if !quiet {
        for warning in &validation_result.warnings {
            println!("{} {}", "Warning:".yellow(), warning);
        }
        println!(
            "Loaded {} sections, {} subjects, {} labs, {} teachers, {} classrooms, {} lab rooms",
            snapshot.sections.len(),
            snapshot.subjects.len(),
            snapshot.labs.len(),
            snapshot.teachers.len(),
            snapshot.classrooms.len(),
            snapshot.lab_rooms.len(),
        );
    }

    let mut config = load_config_or_default(&data.join("config.toml"));
    if let Some(kind) = refiner {
        config.refiner.kind = match kind.to_ascii_lowercase().as_str() {
            "swarm" => RefinerKind::Swarm,
            _ => RefinerKind::Evolutionary,
        };
    }

    let options = GenerateOptions {
        term,
        academic_year: year.to_string(),
        seed,
        refine,
        config,
    };

    let baseline_findings = if monotonic {
        load_baseline_findings(&output.join("timetables.json"), &snapshot)
    } else {
        None
    };

    let outcome = generate_timetables(&snapshot, &options, quiet)?;

    let should_save = match baseline_findings {
        Some(baseline) if monotonic => {
            let current = outcome.validation.conflicts.len();
            if current <= baseline {
                if !quiet {
                    println!(
                        "{}",
                        format!("✓ Findings: {baseline} → {current}").green().bold()
                    );
                }
                true
            } else {
                if !quiet {
                    println!(
                        "{}",
                        format!("✗ Regression: {baseline} → {current} findings (not saving)")
                            .red()
                            .bold()
                    );
                }
                false
            }
        }
        _ => true,
    };

    if should_save {
        let formats = parse_formats(format);
        generate_reports(&outcome, &snapshot, output, &formats)?;
    }

    if quiet {
        println!("{}", generate_json_summary(&outcome)?);
    } else {
        print_summary(&outcome);
        if should_save {
            println!("Reports written to: {}", output.display().to_string().green());
        }
    }

    Ok(())
}

/// Findings count of a previously saved run, revalidated against the
/// current snapshot
fn load_baseline_findings(
    path: &PathBuf,
    snapshot: &dept_timetabler::types::Snapshot,
) -> Option<usize> {
    let store = load_store(path).ok()?;
    Some(validate_store(&store, snapshot).conflicts.len())
}

fn load_store(path: &PathBuf) -> Result<ScheduleStore> {
    let content = std::fs::read_to_string(path)?;
    let timetables: Vec<Timetable> = serde_json::from_str(&content)?;
    let term = timetables
        .first()
        .map(|t| t.term)
        .unwrap_or(Term::Odd);
    let year = timetables
        .first()
        .map(|t| t.academic_year.clone())
        .unwrap_or_default();
    let mut store = ScheduleStore::new(term, year);
    for timetable in timetables {
        store.insert_timetable(timetable);
    }
    store.rebuild_occupancy();
    Ok(store)
}

fn run_validate(schedule_path: &PathBuf, data: &PathBuf, verbose: bool) -> Result<()> {
    let snapshot = load_snapshot_from_dir(data)?;
    let store = load_store(schedule_path)?;

    let report = validate_store(&store, &snapshot);

    if report.is_clean() {
        println!("{}", "✓ Timetables are conflict-free".green().bold());
    } else {
        println!(
            "{}",
            format!("⚠ {} findings", report.conflicts.len()).yellow().bold()
        );
        if verbose {
            for conflict in &report.conflicts {
                println!("  - {}: {}", conflict.rule.red(), conflict.message);
            }
        }
    }

    println!();
    println!("  Theory sessions:      {}", report.statistics.theory_sessions);
    println!("  Lab sessions:         {}", report.statistics.lab_sessions);
    println!("  Teacher conflicts:    {}", report.statistics.teacher_conflicts);
    println!("  Classroom conflicts:  {}", report.statistics.classroom_conflicts);
    println!("  Lab room conflicts:   {}", report.statistics.lab_room_conflicts);
    println!("  Coverage gaps:        {}", report.statistics.coverage_gaps);
    println!("  Under-staffed batches:{}", report.statistics.unstaffed_batches);

    Ok(())
}

fn run_report(
    schedule_path: &PathBuf,
    data: &PathBuf,
    section: Option<String>,
    teacher: Option<String>,
) -> Result<()> {
    let snapshot = load_snapshot_from_dir(data)?;
    let store = load_store(schedule_path)?;

    if let Some(section_id) = section {
        match generate_section_report(&store, &snapshot, &SectionId(section_id)) {
            Some(report) => println!("{report}"),
            None => println!("Section not found"),
        }
    } else if let Some(teacher_id) = teacher {
        match generate_teacher_report(&store, &snapshot, &TeacherId(teacher_id)) {
            Some(report) => println!("{report}"),
            None => println!("Teacher not found"),
        }
    } else {
        for timetable in store.timetables() {
            println!(
                "{}: {} theory, {} lab sessions, {} flags",
                timetable.section_name.bold(),
                timetable.theory_sessions.len(),
                timetable.lab_sessions.len(),
                timetable.flagged_sessions.len()
            );
        }
    }

    Ok(())
}

fn parse_formats(format: &str) -> Vec<OutputFormat> {
    if format == "all" {
        return vec![OutputFormat::Json, OutputFormat::Markdown, OutputFormat::Text];
    }

    format
        .split(',')
        .filter_map(|f| match f.trim().to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            "text" | "txt" => Some(OutputFormat::Text),
            _ => None,
        })
        .collect()
}

fn create_demo_data(path: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(path)?;

    let sections = serde_json::json!([
        {"id": "sec-3a", "name": "3A", "semester": 3},
        {"id": "sec-3b", "name": "3B", "semester": 3},
        {"id": "sec-5a", "name": "5A", "semester": 5},
        {"id": "sec-7a", "name": "7A", "semester": 7}
    ]);
    std::fs::write(
        path.join("sections.json"),
        serde_json::to_string_pretty(&sections)?,
    )?;

    let subjects = serde_json::json!([
        {"id": "ds", "shortform": "DS", "name": "Data Structures", "semester": 3, "hours_per_week": 4.0, "max_hours_per_day": 1.0},
        {"id": "dm", "shortform": "DM", "name": "Discrete Mathematics", "semester": 3, "hours_per_week": 3.0, "max_hours_per_day": 1.0},
        {"id": "co", "shortform": "CO", "name": "Computer Organization", "semester": 3, "hours_per_week": 3.0, "max_hours_per_day": 1.0},
        {"id": "dbms", "shortform": "DBMS", "name": "Database Systems", "semester": 5, "hours_per_week": 4.0, "max_hours_per_day": 1.0},
        {"id": "cn", "shortform": "CN", "name": "Computer Networks", "semester": 5, "hours_per_week": 3.0, "max_hours_per_day": 1.0},
        {"id": "minip", "shortform": "MP", "name": "Mini Project", "semester": 5, "hours_per_week": 2.0, "max_hours_per_day": 2.0, "is_project": true},
        {"id": "ml", "shortform": "ML", "name": "Machine Learning", "semester": 7, "hours_per_week": 4.0, "max_hours_per_day": 1.0},
        {"id": "oec1", "shortform": "OEC", "name": "Open Elective", "semester": 7, "hours_per_week": 3.0, "max_hours_per_day": 1.5,
         "requires_teacher": false, "is_open_elective": true, "is_external_dept": true,
         "fixed_schedule": [
            {"day": "Monday", "start": "09:00 AM", "end": "10:30 AM"},
            {"day": "Thursday", "start": "02:00 PM", "end": "03:30 PM"}
         ]}
    ]);
    std::fs::write(
        path.join("subjects.json"),
        serde_json::to_string_pretty(&subjects)?,
    )?;

    let labs = serde_json::json!([
        {"id": "dslab", "shortform": "DSL", "name": "Data Structures Lab", "semester": 3, "required_equipment_tag": "workstations"},
        {"id": "colab", "shortform": "COL", "name": "Microprocessors Lab", "semester": 3, "required_equipment_tag": "microprocessors"},
        {"id": "adalab", "shortform": "ADA", "name": "Algorithms Lab", "semester": 3, "required_equipment_tag": "workstations"},
        {"id": "dbmslab", "shortform": "DBL", "name": "DBMS Lab", "semester": 5, "required_equipment_tag": "workstations"},
        {"id": "cnlab", "shortform": "CNL", "name": "Networks Lab", "semester": 5, "required_equipment_tag": "networking"},
        {"id": "mllab", "shortform": "MLL", "name": "ML Lab", "semester": 7, "required_equipment_tag": "gpu"}
    ]);
    std::fs::write(path.join("labs.json"), serde_json::to_string_pretty(&labs)?)?;

    let teachers = serde_json::json!([
        {"id": "t01", "shortform": "AKM", "name": "Dr. A K Murthy", "subjects_taught": ["ds", "dm"], "labs_taught": ["dslab", "adalab"]},
        {"id": "t02", "shortform": "SRD", "name": "Prof. S R Devi", "subjects_taught": ["ds", "co"], "labs_taught": ["dslab", "colab"]},
        {"id": "t03", "shortform": "VNR", "name": "Dr. V N Rao", "subjects_taught": ["dm", "co"], "labs_taught": ["colab", "adalab"]},
        {"id": "t04", "shortform": "PSK", "name": "Prof. P S Kumar", "subjects_taught": ["dbms"], "labs_taught": ["dbmslab", "dslab"]},
        {"id": "t05", "shortform": "LMN", "name": "Dr. L M Nair", "subjects_taught": ["cn"], "labs_taught": ["cnlab", "dbmslab"]},
        {"id": "t06", "shortform": "RGP", "name": "Prof. R G Patil", "subjects_taught": ["ml"], "labs_taught": ["mllab", "adalab"]},
        {"id": "t07", "shortform": "KSB", "name": "Dr. K S Bhat", "subjects_taught": ["ds", "dbms"], "labs_taught": ["dslab", "dbmslab", "mllab"]},
        {"id": "t08", "shortform": "MJA", "name": "Prof. M J Anand", "subjects_taught": ["co", "cn"], "labs_taught": ["colab", "cnlab"]},
        {"id": "t09", "shortform": "TSH", "name": "Dr. T S Hegde", "subjects_taught": ["dm", "ml"], "labs_taught": ["adalab", "mllab"]},
        {"id": "t10", "shortform": "NVK", "name": "Prof. N V Kini", "subjects_taught": ["cn", "dbms"], "labs_taught": ["cnlab", "dbmslab"]}
    ]);
    std::fs::write(
        path.join("teachers.json"),
        serde_json::to_string_pretty(&teachers)?,
    )?;

    let classrooms = serde_json::json!([
        {"id": "c101", "number": "101"},
        {"id": "c102", "number": "102"},
        {"id": "c103", "number": "103"},
        {"id": "c201", "number": "201"}
    ]);
    std::fs::write(
        path.join("classrooms.json"),
        serde_json::to_string_pretty(&classrooms)?,
    )?;

    let lab_rooms = serde_json::json!([
        {"id": "lr1", "number": "L-101", "equipment_tags": ["workstations"]},
        {"id": "lr2", "number": "L-102", "equipment_tags": ["workstations", "networking"]},
        {"id": "lr3", "number": "L-103", "equipment_tags": ["microprocessors"]},
        {"id": "lr4", "number": "L-201", "equipment_tags": ["workstations", "gpu"]},
        {"id": "lr5", "number": "L-202", "equipment_tags": ["networking", "workstations"]}
    ]);
    std::fs::write(
        path.join("lab_rooms.json"),
        serde_json::to_string_pretty(&lab_rooms)?,
    )?;

    let theory_assignments = serde_json::json!([
        {"section": "sec-3a", "subject": "ds", "teacher": "t01"},
        {"section": "sec-3a", "subject": "dm", "teacher": "t03"},
        {"section": "sec-3a", "subject": "co", "teacher": "t02"},
        {"section": "sec-3b", "subject": "ds", "teacher": "t02"},
        {"section": "sec-3b", "subject": "dm", "teacher": "t09"},
        {"section": "sec-3b", "subject": "co", "teacher": "t08"},
        {"section": "sec-5a", "subject": "dbms", "teacher": "t04"},
        {"section": "sec-5a", "subject": "cn", "teacher": "t05"},
        {"section": "sec-5a", "subject": "minip", "teacher": "t10"},
        {"section": "sec-7a", "subject": "ml", "teacher": "t06"}
    ]);
    std::fs::write(
        path.join("theory_assignments.json"),
        serde_json::to_string_pretty(&theory_assignments)?,
    )?;

    let lab_assignments = serde_json::json!([
        {"section": "sec-3a", "batch_number": 1, "lab": "dslab", "preferred_teachers": ["t01", "t02"]},
        {"section": "sec-3a", "batch_number": 2, "lab": "colab", "preferred_teachers": ["t03"]},
        {"section": "sec-3a", "batch_number": 3, "lab": "adalab", "preferred_teachers": []},
        {"section": "sec-3b", "batch_number": 1, "lab": "dslab", "preferred_teachers": ["t07"]},
        {"section": "sec-5a", "batch_number": 1, "lab": "dbmslab", "preferred_teachers": ["t04", "t10"]},
        {"section": "sec-5a", "batch_number": 2, "lab": "cnlab", "preferred_teachers": ["t05"]}
    ]);
    std::fs::write(
        path.join("lab_assignments.json"),
        serde_json::to_string_pretty(&lab_assignments)?,
    )?;

    println!("{}", "Demo data created successfully!".green());
    Ok(())
}
