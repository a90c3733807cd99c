//! Client library for the SSIS registrar API: list views with paging,
//! sorting, search and filters, CRUD dialogs and the signed-in session.

pub mod dialogs;
pub mod error;
pub mod http;
pub mod list_adapter;
pub mod page;
pub mod pagination;
pub mod query_state;
pub mod resource;
pub mod session;
pub mod validation;

pub use dialogs::{CountdownPending, DeleteConfirmation, DialogMode, EditorDialog, ErrorDialog};
pub use error::{ClientError, FieldError, ValidationError};
pub use http::SsisClient;
pub use list_adapter::PageResult;
pub use page::{DeleteOutcome, FacetOptions, ListPage};
pub use pagination::{PageMarker, PageWindow};
pub use query_state::{FetchOutcome, Filters, ListSnapshot, ListSource, QueryController, QueryState};
pub use resource::{AvatarUpload, Draft, Resource, StudentDraft};
pub use session::{AuthState, SessionContext};
