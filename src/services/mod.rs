// Service modules
// Domain logic and the backend client

pub mod api;
pub mod certificate;
pub mod content;
pub mod pdf;
pub mod progress;
pub mod quiz;
pub mod resource;
pub mod routing;
pub mod validation;

pub use api::{
    ApiClient,
    ApiConfig,
    ApiError,
    ApiResult,
    CategoryPayload,
    CourseForm,
    LoginRequest,
    NewCourse,
    NewUser,
    RegisterRequest,
    ResourcePayload,
    RolePayload,
    Upload,
    UserForm,
    DEFAULT_API_URL,
};

pub use certificate::{
    CertificateAssets,
    CertificateRequest,
    CertificateTemplate,
};

pub use content::{classify, embed_url, is_video_link, ResourceContent};

pub use progress::{percentage, CourseProgress};

pub use quiz::{NextOutcome, QuizDraft, QuizRunner, Tally};

pub use resource::{CourseCatalog, FetchOutcome, OpenResource, ResourceFetcher};

pub use routing::{resolve, Route, RouteDecision, RouteGroup};

pub use validation::{ContentSource, FieldErrors, ResourceForm};
