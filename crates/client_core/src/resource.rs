//! Binds each record type to its endpoint and its create/update body.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use shared::{
    domain::{College, Program, Student},
    protocol::{CollegeDraft, ProgramDraft, StudentFields},
};

use crate::{
    error::{ClientError, ValidationError},
    validation,
};

/// Body of a create or update request.
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Form),
}

/// Create/update payload collected by a dialog.
pub trait Draft: Clone + Send + Sync + 'static {
    fn validate(&self) -> Result<(), ValidationError>;
    fn into_body(self) -> Result<RequestBody, ClientError>;
}

/// A record served by a paginated CRUD endpoint under `/api`.
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Path segment, e.g. `colleges`.
    const PATH: &'static str;
    /// Singular name used in messages.
    const LABEL: &'static str;
    const DEFAULT_SORT: &'static str;
    const SORT_COLUMNS: &'static [&'static str];
    /// Multi-select filter facets the list endpoint understands.
    const FACETS: &'static [&'static str];

    type Draft: Draft;

    /// Natural key used in `/<entity>/<key>` URLs.
    fn key(&self) -> &str;
    fn to_draft(&self) -> Self::Draft;
}

impl Resource for College {
    const PATH: &'static str = "colleges";
    const LABEL: &'static str = "college";
    const DEFAULT_SORT: &'static str = "college_code";
    const SORT_COLUMNS: &'static [&'static str] = &["college_code", "college_name"];
    const FACETS: &'static [&'static str] = &[];

    type Draft = CollegeDraft;

    fn key(&self) -> &str {
        self.college_code.as_str()
    }

    fn to_draft(&self) -> CollegeDraft {
        CollegeDraft {
            college_code: self.college_code.clone(),
            college_name: self.college_name.clone(),
        }
    }
}

impl Resource for Program {
    const PATH: &'static str = "programs";
    const LABEL: &'static str = "program";
    const DEFAULT_SORT: &'static str = "program_code";
    const SORT_COLUMNS: &'static [&'static str] = &["program_code", "program_name", "college_code"];
    const FACETS: &'static [&'static str] = &[];

    type Draft = ProgramDraft;

    fn key(&self) -> &str {
        self.program_code.as_str()
    }

    fn to_draft(&self) -> ProgramDraft {
        ProgramDraft {
            program_code: self.program_code.clone(),
            program_name: self.program_name.clone(),
            college_code: self.college_code.clone(),
        }
    }
}

impl Resource for Student {
    const PATH: &'static str = "student";
    const LABEL: &'static str = "student";
    const DEFAULT_SORT: &'static str = "student_id";
    const SORT_COLUMNS: &'static [&'static str] =
        &["student_id", "lastname", "program_code", "year", "gender"];
    const FACETS: &'static [&'static str] = &["program", "year", "gender"];

    type Draft = StudentDraft;

    fn key(&self) -> &str {
        self.student_id.as_str()
    }

    fn to_draft(&self) -> StudentDraft {
        StudentDraft {
            fields: StudentFields {
                student_id: self.student_id.clone(),
                firstname: self.firstname.clone(),
                lastname: self.lastname.clone(),
                program_code: self.program_code.clone(),
                year: self.year,
                gender: self.gender.clone(),
            },
            avatar: None,
        }
    }
}

impl Draft for CollegeDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        validation::check_code(&mut errors, "college_code", self.college_code.as_str());
        validation::check_name(&mut errors, "college_name", &self.college_name);
        errors.into_result()
    }

    fn into_body(self) -> Result<RequestBody, ClientError> {
        Ok(RequestBody::Json(serde_json::to_value(self)?))
    }
}

impl Draft for ProgramDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        validation::check_code(&mut errors, "program_code", self.program_code.as_str());
        validation::check_name(&mut errors, "program_name", &self.program_name);
        validation::check_code(&mut errors, "college_code", self.college_code.as_str());
        errors.into_result()
    }

    fn into_body(self) -> Result<RequestBody, ClientError> {
        Ok(RequestBody::Json(serde_json::to_value(self)?))
    }
}

/// Image attached to a student record as the `avatar` multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl AvatarUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            filename,
            bytes,
            mime_type,
        }
    }

    /// Reads an image from disk, refusing files over the upload limit
    /// before they are loaded.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|err| {
            ValidationError::single("avatar", format!("cannot read {}: {err}", path.display()))
        })?;
        let mut errors = ValidationError::default();
        validation::check_avatar_size(
            &mut errors,
            usize::try_from(metadata.len()).unwrap_or(usize::MAX),
        );
        errors.into_result()?;

        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ValidationError::single("avatar", format!("cannot read {}: {err}", path.display()))
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());
        Ok(Self::new(filename, bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDraft {
    pub fields: StudentFields,
    pub avatar: Option<AvatarUpload>,
}

impl StudentDraft {
    pub fn new(fields: StudentFields) -> Self {
        Self {
            fields,
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: AvatarUpload) -> Self {
        self.avatar = Some(avatar);
        self
    }
}

impl Draft for StudentDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        let fields = &self.fields;
        let mut errors = ValidationError::default();
        validation::check_student_id(&mut errors, fields.student_id.as_str());
        validation::check_name(&mut errors, "firstname", &fields.firstname);
        validation::check_name(&mut errors, "lastname", &fields.lastname);
        validation::check_code(&mut errors, "program_code", fields.program_code.as_str());
        validation::check_year(&mut errors, fields.year);
        validation::check_gender(&mut errors, &fields.gender);
        if let Some(avatar) = &self.avatar {
            validation::check_avatar_size(&mut errors, avatar.bytes.len());
        }
        errors.into_result()
    }

    fn into_body(self) -> Result<RequestBody, ClientError> {
        let StudentDraft { fields, avatar } = self;
        let mut form = Form::new()
            .text("student_id", fields.student_id.0)
            .text("firstname", fields.firstname)
            .text("lastname", fields.lastname)
            .text("program_code", fields.program_code.0)
            .text("year", fields.year.to_string())
            .text("gender", fields.gender);

        if let Some(avatar) = avatar {
            let mut part = Part::bytes(avatar.bytes).file_name(avatar.filename);
            if let Some(mime) = avatar.mime_type {
                part = part.mime_str(&mime).map_err(|_| {
                    ValidationError::single("avatar", format!("unsupported file type {mime}"))
                })?;
            }
            form = form.part("avatar", part);
        }

        Ok(RequestBody::Multipart(form))
    }
}
