//! Aggregates a class's grades into the sheet model consumed by the
//! spreadsheet writer: one summary sheet plus one sheet per subject.

use std::collections::HashMap;

use crate::db::models::Student;
use crate::repositories::grades::ReportRow;
use crate::db::types::GradeType;
use crate::services::xlsx::sheet_name;

const H_NAME: &str = "Nama Siswa";
const H_NIS: &str = "NIS";
const H_FINAL: &str = "Nilai Akhir";
const H_TASK_TOTAL: &str = "Jumlah Nilai Tugas";
const H_TASK_AVG: &str = "Rata-rata Tugas";
const H_OVERALL: &str = "Rata-rata Keseluruhan";
const H_SUBJECT_COUNT: &str = "Jumlah Mapel";

const FALLBACK_TASK_LABEL: &str = "Tugas";
const PLACEHOLDER: &str = "Belum ada data";
const ROSTER_PLACEHOLDER: &str = "Belum ada data siswa";
const DASH: &str = "-";
const SUBJECT_STATS_LABEL: &str = "STATISTIK KELAS";
const SUMMARY_STATS_LABEL: &str = "RATA-RATA KELAS";
const SUMMARY_SHEET_NAME: &str = "Ringkasan Nilai";

const TASK_WEIGHT: f64 = 0.7;
const FINAL_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn dash() -> Self {
        Cell::Text(DASH.to_string())
    }

    fn fixed1(value: f64) -> Self {
        Cell::Text(format!("{value:.1}"))
    }

    fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(value) => Cell::fixed1(value),
            None => Cell::dash(),
        }
    }

    /// Numeric view of the cell; computed columns carry their value as
    /// fixed-point text, so those parse back here for the statistics row.
    pub(crate) fn numeric(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => text.parse::<f64>().ok(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Sheet {
    pub(crate) name: String,
    pub(crate) headers: Vec<String>,
    pub(crate) widths: Vec<u16>,
    pub(crate) rows: Vec<Vec<Cell>>,
}

#[derive(Default)]
struct StudentGrades {
    tasks: HashMap<usize, f64>,
    final_grade: Option<f64>,
}

struct SubjectAgg {
    name: String,
    task_labels: Vec<String>,
    per_student: HashMap<String, StudentGrades>,
}

impl SubjectAgg {
    fn task_label_index(&mut self, label: &str) -> usize {
        match self.task_labels.iter().position(|existing| existing == label) {
            Some(index) => index,
            None => {
                self.task_labels.push(label.to_string());
                self.task_labels.len() - 1
            }
        }
    }
}

struct StudentComputed {
    task_values: Vec<Option<f64>>,
    task_total: Option<f64>,
    task_average: Option<f64>,
    final_grade: Option<f64>,
    overall: Option<f64>,
}

fn compute_student(agg: &SubjectAgg, student_name: &str) -> StudentComputed {
    let grades = agg.per_student.get(student_name);

    let task_values: Vec<Option<f64>> = (0..agg.task_labels.len())
        .map(|index| grades.and_then(|g| g.tasks.get(&index).copied()))
        .collect();

    let present: Vec<f64> = task_values.iter().filter_map(|value| *value).collect();
    let task_total = (!present.is_empty()).then(|| present.iter().sum::<f64>());
    let task_average = task_total.map(|total| total / present.len() as f64);
    let final_grade = grades.and_then(|g| g.final_grade);

    let overall = match (task_average, final_grade) {
        (Some(avg), Some(fin)) => Some(avg * TASK_WEIGHT + fin * FINAL_WEIGHT),
        (Some(avg), None) => Some(avg),
        (None, Some(fin)) => Some(fin),
        (None, None) => None,
    };

    StudentComputed { task_values, task_total, task_average, final_grade, overall }
}

/// Builds the full report from the flat student/grade join. The summary
/// sheet comes first; subject sheets follow in the order subjects first
/// appear in the data. Every sheet lists the whole class, students
/// without grades showing `-` across the board.
pub(crate) fn build_grade_report(rows: &[ReportRow]) -> Vec<Sheet> {
    let mut students: Vec<(String, Option<String>)> = Vec::new();
    let mut subjects: Vec<SubjectAgg> = Vec::new();

    for row in rows {
        if !students.iter().any(|(name, _)| name == &row.student_name) {
            students.push((row.student_name.clone(), row.nis.clone()));
        }

        let (Some(subject_name), Some(grade_value)) = (&row.subject_name, row.grade_value) else {
            continue;
        };

        let subject_index =
            match subjects.iter().position(|subject| &subject.name == subject_name) {
                Some(index) => index,
                None => {
                    subjects.push(SubjectAgg {
                        name: subject_name.clone(),
                        task_labels: Vec::new(),
                        per_student: HashMap::new(),
                    });
                    subjects.len() - 1
                }
            };
        let subject = &mut subjects[subject_index];

        match row.grade_type {
            Some(GradeType::Task) => {
                let label = row.task_name.as_deref().unwrap_or(FALLBACK_TASK_LABEL);
                let index = subject.task_label_index(label);
                subject
                    .per_student
                    .entry(row.student_name.clone())
                    .or_default()
                    .tasks
                    .insert(index, grade_value);
            }
            Some(GradeType::Final) | None => {
                subject
                    .per_student
                    .entry(row.student_name.clone())
                    .or_default()
                    .final_grade = Some(grade_value);
            }
        }
    }

    let mut sheets = vec![build_summary_sheet(&students, &subjects)];
    for subject in &subjects {
        sheets.push(build_subject_sheet(&students, subject));
    }
    sheets
}

fn build_summary_sheet(students: &[(String, Option<String>)], subjects: &[SubjectAgg]) -> Sheet {
    if students.is_empty() {
        return Sheet {
            name: SUMMARY_SHEET_NAME.to_string(),
            headers: vec![H_NAME.to_string(), H_NIS.to_string()],
            widths: vec![25, 15],
            rows: vec![vec![Cell::Text(PLACEHOLDER.to_string()), Cell::dash()]],
        };
    }

    let mut headers = vec![H_NAME.to_string(), H_NIS.to_string()];
    let mut widths = vec![25u16, 15];
    for subject in subjects {
        headers.push(subject.name.clone());
        widths.push(15);
    }
    headers.push(H_OVERALL.to_string());
    widths.push(20);
    headers.push(H_SUBJECT_COUNT.to_string());
    widths.push(15);

    let mut rows: Vec<Vec<Cell>> = Vec::new();

    for (student_name, nis) in students {
        let mut row = vec![
            Cell::Text(student_name.clone()),
            Cell::Text(nis.clone().unwrap_or_else(|| DASH.to_string())),
        ];

        let mut total = 0.0;
        let mut counted = 0usize;

        for subject in subjects {
            let computed = compute_student(subject, student_name);
            // Final grade when recorded, otherwise the task average.
            let value = computed.final_grade.or(computed.task_average);
            if let Some(value) = value {
                total += value;
                counted += 1;
            }
            row.push(Cell::from_option(value));
        }

        row.push(Cell::from_option((counted > 0).then(|| total / counted as f64)));
        row.push(Cell::Number(counted as f64));
        rows.push(row);
    }

    // Class average row; the subject-count column carries a label instead.
    let mut stats = vec![Cell::Text(SUMMARY_STATS_LABEL.to_string()), Cell::dash()];
    for column in 2..headers.len() - 1 {
        stats.push(column_mean(&rows, column));
    }
    stats.push(Cell::Text("Total".to_string()));
    rows.push(stats);

    Sheet { name: SUMMARY_SHEET_NAME.to_string(), headers, widths, rows }
}

fn build_subject_sheet(students: &[(String, Option<String>)], subject: &SubjectAgg) -> Sheet {
    let mut headers = vec![H_NAME.to_string(), H_NIS.to_string()];
    let mut widths = vec![25u16, 15];
    for label in &subject.task_labels {
        headers.push(label.clone());
        widths.push(15);
    }
    headers.push(H_FINAL.to_string());
    widths.push(15);
    headers.push(H_TASK_TOTAL.to_string());
    widths.push(18);
    headers.push(H_TASK_AVG.to_string());
    widths.push(18);
    headers.push(H_OVERALL.to_string());
    widths.push(20);

    if students.is_empty() {
        return Sheet {
            name: sheet_name(&subject.name),
            headers: vec![H_NAME.to_string(), H_NIS.to_string()],
            widths: vec![25, 15],
            rows: vec![vec![Cell::Text(PLACEHOLDER.to_string()), Cell::dash()]],
        };
    }

    let mut rows: Vec<Vec<Cell>> = Vec::new();

    for (student_name, nis) in students {
        let computed = compute_student(subject, student_name);

        let mut row = vec![
            Cell::Text(student_name.clone()),
            Cell::Text(nis.clone().unwrap_or_else(|| DASH.to_string())),
        ];
        for value in &computed.task_values {
            row.push(match value {
                Some(value) => Cell::Number(*value),
                None => Cell::dash(),
            });
        }
        row.push(match computed.final_grade {
            Some(value) => Cell::Number(value),
            None => Cell::dash(),
        });
        row.push(Cell::from_option(computed.task_total));
        row.push(Cell::from_option(computed.task_average));
        row.push(Cell::from_option(computed.overall));
        rows.push(row);
    }

    let mut stats = vec![Cell::Text(SUBJECT_STATS_LABEL.to_string()), Cell::dash()];
    for column in 2..headers.len() {
        stats.push(column_mean(&rows, column));
    }
    rows.push(stats);

    Sheet { name: sheet_name(&subject.name), headers, widths, rows }
}

/// Mean over the rows whose cell at `column` is numeric; dashes do not
/// count toward the denominator.
fn column_mean(rows: &[Vec<Cell>], column: usize) -> Cell {
    let values: Vec<f64> = rows.iter().filter_map(|row| row.get(column)?.numeric()).collect();
    if values.is_empty() {
        Cell::dash()
    } else {
        Cell::fixed1(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Plain roster listing for the student-list export.
pub(crate) fn build_student_roster(students: &[Student], class_name: &str) -> Sheet {
    let headers = vec![
        "No".to_string(),
        H_NAME.to_string(),
        H_NIS.to_string(),
        "Tanggal Daftar".to_string(),
    ];
    let widths = vec![5, 25, 15, 15];

    let mut rows: Vec<Vec<Cell>> = students
        .iter()
        .enumerate()
        .map(|(index, student)| {
            vec![
                Cell::Number((index + 1) as f64),
                Cell::Text(student.name.clone()),
                Cell::Text(student.nis.clone().unwrap_or_else(|| DASH.to_string())),
                Cell::Text(format!(
                    "{:02}/{:02}/{:04}",
                    student.created_at.day(),
                    u8::from(student.created_at.month()),
                    student.created_at.year()
                )),
            ]
        })
        .collect();

    if rows.is_empty() {
        rows.push(vec![
            Cell::Number(1.0),
            Cell::Text(ROSTER_PLACEHOLDER.to_string()),
            Cell::dash(),
            Cell::dash(),
        ]);
    }

    Sheet { name: sheet_name(&format!("Daftar_Siswa_{class_name}")), headers, widths, rows }
}
