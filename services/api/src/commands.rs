use clap::Args;
use risk_intake::assessment::{
    AnswerSet, QuestionCatalog, QuestionGroup, RecordId, ScoreReport, ScoringEngine, SortDirection,
    SortKey, SortState, StoredSubmission, SummaryList,
};
use risk_intake::error::AppError;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON object mapping question codes (canonical or legacy) to 1, 2 or 3
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Print the full report as JSON instead of the text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Limit the listing to one group (hazard, exposure, vulnerability)
    #[arg(long, value_parser = parse_group)]
    pub(crate) group: Option<QuestionGroup>,
    /// Print each question as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// JSON array of stored documents, each carrying its `id`
    #[arg(long)]
    pub(crate) records: PathBuf,
    /// Sort column (name, code, coordinates, risk_index, risk_description); newest first when omitted
    #[arg(long, value_parser = parse_sort_key)]
    pub(crate) sort: Option<SortKey>,
    /// Sort direction (asc, desc)
    #[arg(long, value_parser = parse_direction, default_value = "asc")]
    pub(crate) dir: SortDirection,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

fn parse_snake_case<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|_| format!("unrecognized value '{raw}'"))
}

pub(crate) fn parse_group(raw: &str) -> Result<QuestionGroup, String> {
    parse_snake_case(raw)
}

pub(crate) fn parse_sort_key(raw: &str) -> Result<SortKey, String> {
    parse_snake_case(raw)
}

pub(crate) fn parse_direction(raw: &str) -> Result<SortDirection, String> {
    parse_snake_case(raw)
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let reader = BufReader::new(File::open(&args.answers)?);
    let answers: AnswerSet = serde_json::from_reader(reader)?;
    let report = ScoringEngine::standard().report(&answers);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        render_score_report(&mut out, &report)?;
    }
    Ok(())
}

fn render_score_report(out: &mut impl Write, report: &ScoreReport) -> io::Result<()> {
    writeln!(out, "Risk intake score")?;
    for (name, value) in report.scores.fields() {
        writeln!(out, "- {name}: {value:.2}")?;
    }
    writeln!(
        out,
        "- Ratings: hazard {:.3} | exposure {:.3} | vulnerability {:.3} | product {:.2}",
        report.ratings.hazard,
        report.ratings.exposure,
        report.ratings.vulnerability,
        report.ratings.risk_rating
    )?;
    writeln!(out, "- Provisional band: {}", report.band.label())?;
    if report.complete {
        writeln!(out, "All questions answered.")?;
    } else {
        let missing: Vec<String> = report.missing.iter().map(ToString::to_string).collect();
        writeln!(
            out,
            "{} unanswered: {}",
            missing.len(),
            missing.join(", ")
        )?;
    }
    Ok(())
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = QuestionCatalog::standard();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for question in catalog
        .questions()
        .iter()
        .filter(|question| args.group.map_or(true, |group| question.code.group() == group))
    {
        if args.json {
            let line = json!({
                "code": question.code,
                "legacy_key": question.legacy_key,
                "title": question.title,
                "weight": question.weight,
                "choices": question.choices.choices(),
            });
            writeln!(out, "{line}")?;
            continue;
        }
        let choices: Vec<String> = question
            .choices
            .choices()
            .iter()
            .map(|choice| format!("{}={}", choice.value, choice.label))
            .collect();
        writeln!(
            out,
            "{:<6} w{} {:<40} [{}]",
            question.code.to_string(),
            question.weight,
            question.title,
            choices.join(", ")
        )?;
    }
    Ok(())
}

/// Turn a JSON dump into stored submissions; documents without an `id` get their position.
pub(crate) fn records_from_dump(dump: Value) -> Result<Vec<StoredSubmission>, AppError> {
    let Value::Array(documents) = dump else {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "record dump must be a JSON array",
        )));
    };

    Ok(documents
        .into_iter()
        .enumerate()
        .map(|(index, document)| {
            let id = match document.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => format!("row-{}", index + 1),
            };
            StoredSubmission {
                id: RecordId(id),
                document,
            }
        })
        .collect())
}

pub(crate) fn summary_for_export(
    records: &[StoredSubmission],
    sort: Option<SortKey>,
    dir: SortDirection,
) -> SummaryList {
    let list = SummaryList::from_records(records);
    match sort {
        Some(key) => list.sorted_by(SortState::new(key, dir)),
        None => list,
    }
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let reader = BufReader::new(File::open(&args.records)?);
    let records = records_from_dump(serde_json::from_reader(reader)?)?;
    let list = summary_for_export(&records, args.sort, args.dir);

    match args.output {
        Some(path) => {
            list.write_csv(File::create(&path)?)?;
            eprintln!("Wrote {} rows to {}", list.len(), path.display());
        }
        None => list.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_intake::assessment::AnswerValue;
    use serde_json::json;

    #[test]
    fn cli_values_parse_snake_case() {
        assert_eq!(parse_sort_key("risk_index"), Ok(SortKey::RiskIndex));
        assert_eq!(parse_sort_key("Name"), Ok(SortKey::Name));
        assert_eq!(parse_direction("DESC"), Ok(SortDirection::Desc));
        assert_eq!(parse_group("exposure"), Ok(QuestionGroup::Exposure));
        assert!(parse_sort_key("height").is_err());
    }

    #[test]
    fn dump_ids_fall_back_to_position() {
        let records = records_from_dump(json!([
            { "id": "abc", "meta": { "buildingName": "Hall" } },
            { "meta": { "buildingName": "Annex" } }
        ]))
        .expect("array dump");

        assert_eq!(records[0].id, RecordId("abc".to_string()));
        assert_eq!(records[1].id, RecordId("row-2".to_string()));
        assert!(records_from_dump(json!({ "id": "x" })).is_err());
    }

    #[test]
    fn export_sorts_then_writes_csv() {
        let records = records_from_dump(json!([
            { "id": "a", "meta": { "buildingName": "Hall" }, "prediction": { "score": 0.2, "risk": "LOW" } },
            { "id": "b", "meta": { "buildingName": "Annex" }, "prediction": { "score": 0.7, "risk": "HIGH" } }
        ]))
        .expect("array dump");

        let list = summary_for_export(&records, Some(SortKey::RiskIndex), SortDirection::Desc);
        let mut buffer = Vec::new();
        list.write_csv(&mut buffer).expect("csv");
        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[1], "b,Annex,—,—,0.700,HIGH");
        assert_eq!(lines[2], "a,Hall,—,—,0.200,LOW");
    }

    #[test]
    fn score_summary_lists_missing_codes() {
        let catalog = QuestionCatalog::standard();
        let answers = AnswerSet::uniform(catalog, AnswerValue::MAX)
            .without_answer("B1.1".parse().expect("code"));
        let report = ScoringEngine::standard().report(&answers);

        let mut buffer = Vec::new();
        render_score_report(&mut buffer, &report).expect("rendered");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("- HAZARD_SCORE: 75.00"));
        assert!(text.contains("1 unanswered: B1.1"));
    }
}
