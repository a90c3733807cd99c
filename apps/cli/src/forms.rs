//! Field-by-field entry for the add and edit dialogs.

use anyhow::{bail, Context};
use client_core::{AvatarUpload, Resource, StudentDraft};
use shared::{
    domain::{College, CollegeCode, Gender, Program, ProgramCode, Student, StudentId},
    protocol::{CollegeDraft, ProgramDraft, StudentFields},
};

use crate::render::Row;

/// A resource whose draft can be entered as text, one value per field.
pub trait Form: Resource + Row {
    /// Field names in entry order.
    const FIELDS: &'static [&'static str];

    fn values(draft: &Self::Draft) -> Vec<String>;

    /// Builds a draft from values in [`Form::FIELDS`] order. Field rules are
    /// left to the draft's own validation.
    fn build(values: &[String]) -> anyhow::Result<Self::Draft>;

    fn attach_avatar(_draft: Self::Draft, _avatar: AvatarUpload) -> anyhow::Result<Self::Draft> {
        bail!("only students have an avatar")
    }
}

fn expect_fields<const N: usize>(values: &[String]) -> anyhow::Result<&[String; N]> {
    values
        .try_into()
        .with_context(|| format!("expected {N} values, got {}", values.len()))
}

impl Form for College {
    const FIELDS: &'static [&'static str] = &["college_code", "college_name"];

    fn values(draft: &CollegeDraft) -> Vec<String> {
        vec![draft.college_code.to_string(), draft.college_name.clone()]
    }

    fn build(values: &[String]) -> anyhow::Result<CollegeDraft> {
        let [code, name] = expect_fields::<2>(values)?;
        Ok(CollegeDraft {
            college_code: CollegeCode::new(code.trim()),
            college_name: name.trim().to_string(),
        })
    }
}

impl Form for Program {
    const FIELDS: &'static [&'static str] = &["program_code", "program_name", "college_code"];

    fn values(draft: &ProgramDraft) -> Vec<String> {
        vec![
            draft.program_code.to_string(),
            draft.program_name.clone(),
            draft.college_code.to_string(),
        ]
    }

    fn build(values: &[String]) -> anyhow::Result<ProgramDraft> {
        let [code, name, college] = expect_fields::<3>(values)?;
        Ok(ProgramDraft {
            program_code: ProgramCode::new(code.trim()),
            program_name: name.trim().to_string(),
            college_code: CollegeCode::new(college.trim()),
        })
    }
}

impl Form for Student {
    const FIELDS: &'static [&'static str] = &[
        "student_id",
        "firstname",
        "lastname",
        "program_code",
        "year",
        "gender",
    ];

    fn values(draft: &StudentDraft) -> Vec<String> {
        let fields = &draft.fields;
        vec![
            fields.student_id.to_string(),
            fields.firstname.clone(),
            fields.lastname.clone(),
            fields.program_code.to_string(),
            fields.year.to_string(),
            fields.gender.clone(),
        ]
    }

    fn build(values: &[String]) -> anyhow::Result<StudentDraft> {
        let [student_id, firstname, lastname, program, year, gender] = expect_fields::<6>(values)?;
        // Unparseable years become 0 so validation reports the range.
        let year = year.trim().parse().unwrap_or(0);
        let gender = Gender::parse(gender)
            .map(|g| g.as_str().to_string())
            .unwrap_or_else(|| gender.trim().to_string());
        Ok(StudentDraft::new(StudentFields {
            student_id: StudentId::new(student_id.trim()),
            firstname: firstname.trim().to_string(),
            lastname: lastname.trim().to_string(),
            program_code: ProgramCode::new(program.trim()),
            year,
            gender,
        }))
    }

    fn attach_avatar(draft: StudentDraft, avatar: AvatarUpload) -> anyhow::Result<StudentDraft> {
        Ok(draft.with_avatar(avatar))
    }
}

/// Applies `FIELD=VALUE` overrides to `values`.
pub fn apply_overrides<E: Form>(values: &mut [String], overrides: &[String]) -> anyhow::Result<()> {
    for entry in overrides {
        let (field, value) = entry
            .split_once('=')
            .with_context(|| format!("expected FIELD=VALUE, got '{entry}'"))?;
        let Some(index) = E::FIELDS.iter().position(|f| *f == field.trim()) else {
            bail!(
                "unknown field '{field}', expected one of: {}",
                E::FIELDS.join(", ")
            );
        };
        values[index] = value.to_string();
    }
    Ok(())
}
