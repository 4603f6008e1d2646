//! Domain layer for the folio portfolio suite: article, citation and user
//! records, list-query building, and the repositories that keep the
//! article/citation relationship consistent.

pub mod article;
pub mod articles;
pub mod citation;
pub mod citations;
pub mod error;
pub mod query_builder;
pub mod repair;
pub mod user;
pub mod users;
pub mod validation;

pub use article::{Article, ArticleDraft, ArticleHit, ArticleWithCitations};
pub use articles::ArticleRepository;
pub use citation::{Citation, CitationDraft, CitationPatch};
pub use citations::CitationRepository;
pub use error::{parse_id, ArchiveError};
pub use query_builder::build_list_query;
pub use repair::{reconcile, RepairReport};
pub use user::{PublicUser, User, UserDraft};
pub use users::UserRepository;
pub use validation::FieldError;
