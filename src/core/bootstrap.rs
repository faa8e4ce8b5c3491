use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;

const BASE_SUBJECTS: &[&str] = &[
    "Bahasa Indonesia",
    "Matematika",
    "Pendidikan Pancasila",
    "Pendidikan Agama Islam",
    "Seni",
    "Penjas",
];

const UPPER_GRADE_SUBJECTS: &[&str] = &["Bahasa Inggris", "IPAS"];

/// Seeds the fixed class roster (Kelas 1..6) and each class's default
/// subject list. Safe to run on every startup.
pub(crate) async fn seed_reference_data(state: &AppState) -> anyhow::Result<()> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;

    for class_id in 1..=6i64 {
        sqlx::query(
            "INSERT INTO classes (id, name, description, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(class_id)
        .bind(format!("Kelas {class_id}"))
        .bind(format!("Kelas {class_id} SD"))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for subject in default_subjects_for_class(class_id) {
            sqlx::query(
                "INSERT INTO subjects (id, name, class_id, is_custom, created_at)
                 VALUES (?, ?, ?, 0, ?)
                 ON CONFLICT (name, class_id) DO NOTHING",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(subject)
            .bind(class_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    tracing::info!("Reference classes and default subjects are in place");
    Ok(())
}

fn default_subjects_for_class(class_id: i64) -> Vec<&'static str> {
    let mut subjects: Vec<&'static str> = BASE_SUBJECTS.to_vec();
    if class_id >= 4 {
        subjects.extend_from_slice(UPPER_GRADE_SUBJECTS);
    }
    subjects
}
