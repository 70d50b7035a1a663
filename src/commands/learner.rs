// Learner resource view commands
// Opening resources, answering the quiz, moving between resources and
// issuing the completion certificate

use std::path::PathBuf;

use serde::Serialize;

use crate::commands::AppState;
use crate::services::certificate::{self, CertificateRequest, CertificateTemplate};
use crate::services::content::ResourceContent;
use crate::services::quiz::{NextOutcome, QuizRunner};
use crate::services::resource::{CourseCatalog, FetchOutcome, OpenResource};
use crate::services::routing::RouteGroup;
use crate::utils;

const NO_RESOURCE: &str = "No resource is open";
const NO_QUIZ: &str = "This resource has no quiz";
const NO_SEQUENCE: &str = "The course sequence is not available";

/// Warning shown when moving on without an answer
pub const NEEDS_ANSWER_WARNING: &str = "Please select an answer before continuing.";
pub const ALREADY_COMPLETED_WARNING: &str =
    "The quiz is already completed. Retake it to try again.";

#[derive(Debug, Clone, Serialize)]
pub struct ProgressDto {
    pub position: usize,
    pub total: usize,
    pub percent: u8,
}

/// The current question of a quiz attempt
#[derive(Debug, Clone, Serialize)]
pub struct QuizViewDto {
    pub attempt_id: String,
    pub index: usize,
    pub total: usize,
    pub question: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub is_last_question: bool,
    pub completed: bool,
    pub correct: usize,
    pub incorrect: usize,
}

impl From<&QuizRunner> for QuizViewDto {
    fn from(runner: &QuizRunner) -> Self {
        let quiz = runner.current_question();
        let tally = runner.tally();
        Self {
            attempt_id: runner.attempt_id().to_string(),
            index: runner.current_index(),
            total: runner.len(),
            question: quiz.question().to_string(),
            options: quiz.options().to_vec(),
            selected: runner.answer_for(runner.current_index()).map(str::to_string),
            is_last_question: runner.is_last_question(),
            completed: runner.is_completed(),
            correct: tally.correct,
            incorrect: tally.incorrect,
        }
    }
}

/// Quiz state after a move, with the warning to show when the move was refused
#[derive(Debug, Clone, Serialize)]
pub struct QuizStepDto {
    pub quiz: QuizViewDto,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceViewDto {
    pub resource_id: String,
    pub title: String,
    pub description: String,
    pub content: ResourceContent,
    pub course_title: Option<String>,
    pub progress: Option<ProgressDto>,
    pub previous_id: Option<String>,
    pub next_id: Option<String>,
    /// Finishing the course is only offered here
    pub is_last: bool,
    pub quiz: Option<QuizViewDto>,
}

impl From<&OpenResource> for ResourceViewDto {
    fn from(open: &OpenResource) -> Self {
        Self {
            resource_id: open.resource.id.clone(),
            title: open.resource.title.clone(),
            description: open.resource.description.clone(),
            content: open.content(),
            course_title: open.course_title().map(str::to_string),
            progress: open.progress().map(|p| ProgressDto {
                position: p.index + 1,
                total: p.total,
                percent: p.rounded(),
            }),
            previous_id: open.previous_id().map(str::to_string),
            next_id: open.next_id().map(str::to_string),
            is_last: open.is_last(),
            quiz: open.quiz.as_ref().map(QuizViewDto::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Previous,
    Next,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateDto {
    pub file_name: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Opens a resource.
///
/// `Ok(None)` means a newer open request took over while this one was
/// loading; the view then shows that newer resource.
pub async fn open_resource<C: CourseCatalog>(
    state: &AppState<C>,
    resource_id: String,
) -> Result<Option<ResourceViewDto>, String> {
    state.require(RouteGroup::Learner).await?;
    let outcome = state
        .resource_view
        .open(&resource_id)
        .await
        .map_err(|e| format!("Could not load the resource ({:#})", e))?;

    Ok(match outcome {
        FetchOutcome::Loaded(open) => Some(ResourceViewDto::from(open.as_ref())),
        FetchOutcome::Superseded => None,
    })
}

pub async fn current_view<C: CourseCatalog>(state: &AppState<C>) -> Option<ResourceViewDto> {
    state
        .resource_view
        .with_open(|open| ResourceViewDto::from(&*open))
        .await
}

/// Runs `f` on the quiz of the open resource
async fn with_quiz<C, R>(
    state: &AppState<C>,
    f: impl FnOnce(&mut QuizRunner) -> Result<R, String>,
) -> Result<R, String>
where
    C: CourseCatalog,
{
    state.require(RouteGroup::Learner).await?;
    state
        .resource_view
        .with_open(|open| match open.quiz.as_mut() {
            Some(runner) => f(runner),
            None => Err(NO_QUIZ.to_string()),
        })
        .await
        .ok_or_else(|| NO_RESOURCE.to_string())?
}

/// Selects option `option` (0-based) for the current question
pub async fn select_answer<C: CourseCatalog>(
    state: &AppState<C>,
    option: usize,
) -> Result<QuizViewDto, String> {
    with_quiz(state, |runner| {
        let index = runner.current_index();
        let text = runner
            .current_question()
            .options()
            .get(option)
            .cloned()
            .ok_or_else(|| format!("Option {} does not exist", option + 1))?;
        runner
            .select_answer(index, &text)
            .map_err(|e| e.to_string())?;
        Ok(QuizViewDto::from(&*runner))
    })
    .await
}

pub async fn next_question<C: CourseCatalog>(state: &AppState<C>) -> Result<QuizStepDto, String> {
    with_quiz(state, |runner| {
        let warning = match runner.next() {
            NextOutcome::NeedsAnswer => Some(NEEDS_ANSWER_WARNING.to_string()),
            NextOutcome::AlreadyCompleted(_) => Some(ALREADY_COMPLETED_WARNING.to_string()),
            NextOutcome::Advanced(_) | NextOutcome::Completed(_) => None,
        };
        Ok(QuizStepDto {
            quiz: QuizViewDto::from(&*runner),
            warning,
        })
    })
    .await
}

pub async fn previous_question<C: CourseCatalog>(
    state: &AppState<C>,
) -> Result<QuizViewDto, String> {
    with_quiz(state, |runner| {
        runner.previous();
        Ok(QuizViewDto::from(&*runner))
    })
    .await
}

pub async fn retake_quiz<C: CourseCatalog>(state: &AppState<C>) -> Result<QuizViewDto, String> {
    with_quiz(state, |runner| {
        runner.retake();
        Ok(QuizViewDto::from(&*runner))
    })
    .await
}

/// Opens the previous or next resource of the course
pub async fn go_to_sibling<C: CourseCatalog>(
    state: &AppState<C>,
    direction: Direction,
) -> Result<Option<ResourceViewDto>, String> {
    state.require(RouteGroup::Learner).await?;
    let target = state
        .resource_view
        .with_open(|open| {
            open.position.map(|_| match direction {
                Direction::Previous => open.previous_id().map(str::to_string),
                Direction::Next => open.next_id().map(str::to_string),
            })
        })
        .await
        .ok_or_else(|| NO_RESOURCE.to_string())?
        .ok_or_else(|| NO_SEQUENCE.to_string())?;

    let Some(target) = target else {
        return Err(match direction {
            Direction::Previous => "This is the first resource of the course".to_string(),
            Direction::Next => "This is the last resource of the course".to_string(),
        });
    };
    open_resource(state, target).await
}

/// Issues the certificate from the last resource of the course and writes it
/// to the output directory
pub async fn finish_course<C: CourseCatalog>(
    state: &AppState<C>,
) -> Result<CertificateDto, String> {
    let session = state.require(RouteGroup::Learner).await?;
    let open = state
        .resource_view
        .snapshot()
        .await
        .ok_or_else(|| NO_RESOURCE.to_string())?;

    if !open.is_last() {
        return Err("The course can be finished from its last resource only".to_string());
    }
    let course_title = open
        .course_title()
        .ok_or_else(|| "The course details could not be loaded".to_string())?;

    let request = CertificateRequest {
        learner_name: session.username.clone(),
        course_title: course_title.to_string(),
    };
    let assets = utils::load_certificate_assets(&state.config.assets_dir)
        .await
        .map_err(|e| format!("{:#}", e))?;
    let bytes = certificate::render(&request, &assets, &CertificateTemplate::default())
        .map_err(|e| format!("{:#}", e))?;

    let file_name = request.file_name();
    let path = state.config.output_dir.join(&file_name);
    tokio::fs::create_dir_all(&state.config.output_dir)
        .await
        .map_err(|e| e.to_string())?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| format!("Failed to save {}: {}", path.display(), e))?;

    log::info!(
        "certificate for {} issued: {}",
        session.username,
        path.display()
    );
    Ok(CertificateDto {
        file_name,
        path,
        size: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::state_with;
    use crate::models::{Quiz, Role};
    use crate::services::certificate::tests::jpeg;
    use crate::services::resource::tests::{resource, FakeCatalog};

    fn two_question_catalog() -> FakeCatalog {
        let mut catalog = FakeCatalog::with_course("c1", &["r1", "r2"]);
        let quizzes = vec![
            Quiz::new("First?", vec!["A".into(), "B".into()], "A").unwrap(),
            Quiz::new("Second?", vec!["C".into(), "D".into()], "D").unwrap(),
        ];
        catalog
            .resources
            .insert("r2".into(), resource("r2", "c1", quizzes));
        catalog
    }

    #[tokio::test]
    async fn test_open_requires_learner() {
        let state = state_with(two_question_catalog(), None).await;
        assert!(open_resource(&state, "r1".into()).await.is_err());

        let state = state_with(two_question_catalog(), Some(Role::Admin)).await;
        assert!(open_resource(&state, "r1".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_open_and_navigate() {
        let state = state_with(two_question_catalog(), Some(Role::Learner)).await;

        let view = open_resource(&state, "r1".into()).await.unwrap().unwrap();
        assert_eq!(view.progress.as_ref().unwrap().percent, 50);
        assert_eq!(view.next_id.as_deref(), Some("r2"));
        assert!(!view.is_last);
        assert!(view.quiz.is_none());

        let err = go_to_sibling(&state, Direction::Previous).await.unwrap_err();
        assert!(err.contains("first"));

        let view = go_to_sibling(&state, Direction::Next).await.unwrap().unwrap();
        assert_eq!(view.resource_id, "r2");
        assert!(view.is_last);
        assert_eq!(view.quiz.as_ref().unwrap().question, "First?");
    }

    #[tokio::test]
    async fn test_navigation_without_course_sequence() {
        let mut catalog = two_question_catalog();
        catalog.fail_siblings = true;
        let state = state_with(catalog, Some(Role::Learner)).await;

        let view = open_resource(&state, "r1".into()).await.unwrap().unwrap();
        assert!(view.progress.is_none());

        for direction in [Direction::Previous, Direction::Next] {
            let err = go_to_sibling(&state, direction).await.unwrap_err();
            assert_eq!(err, NO_SEQUENCE);
        }
    }

    #[tokio::test]
    async fn test_quiz_flow_through_commands() {
        let state = state_with(two_question_catalog(), Some(Role::Learner)).await;
        open_resource(&state, "r2".into()).await.unwrap();

        let step = next_question(&state).await.unwrap();
        assert_eq!(step.warning.as_deref(), Some(NEEDS_ANSWER_WARNING));
        assert_eq!(step.quiz.index, 0);

        assert!(select_answer(&state, 5).await.is_err());
        let view = select_answer(&state, 0).await.unwrap();
        assert_eq!(view.selected.as_deref(), Some("A"));

        let step = next_question(&state).await.unwrap();
        assert!(step.warning.is_none());
        assert_eq!(step.quiz.index, 1);

        let view = previous_question(&state).await.unwrap();
        assert_eq!(view.index, 0);
        assert_eq!(view.selected.as_deref(), Some("A"));
        next_question(&state).await.unwrap();

        select_answer(&state, 0).await.unwrap();
        let step = next_question(&state).await.unwrap();
        assert!(step.quiz.completed);
        assert_eq!((step.quiz.correct, step.quiz.incorrect), (1, 1));

        let step = next_question(&state).await.unwrap();
        assert_eq!(step.warning.as_deref(), Some(ALREADY_COMPLETED_WARNING));

        let view = retake_quiz(&state).await.unwrap();
        assert_eq!(view.index, 0);
        assert!(!view.completed);
        assert!(view.selected.is_none());
    }

    #[tokio::test]
    async fn test_quiz_commands_need_a_quiz() {
        let state = state_with(two_question_catalog(), Some(Role::Learner)).await;
        assert_eq!(next_question(&state).await.unwrap_err(), NO_RESOURCE);

        open_resource(&state, "r1".into()).await.unwrap();
        assert_eq!(retake_quiz(&state).await.unwrap_err(), NO_QUIZ);
    }

    #[tokio::test]
    async fn test_finish_course_writes_certificate() {
        let root = std::env::temp_dir().join(format!("brightmind-{}", uuid::Uuid::new_v4()));
        let assets_dir = root.join("assets");
        std::fs::create_dir_all(&assets_dir).unwrap();
        for name in [
            utils::TOP_LEFT_IMAGE,
            utils::BOTTOM_RIGHT_IMAGE,
            utils::EMBLEM_IMAGE,
        ] {
            std::fs::write(assets_dir.join(name), jpeg(6, 6)).unwrap();
        }

        let mut state = state_with(two_question_catalog(), Some(Role::Learner)).await;
        state.config.assets_dir = assets_dir;
        state.config.output_dir = root.join("out");

        open_resource(&state, "r1".into()).await.unwrap();
        let err = finish_course(&state).await.unwrap_err();
        assert!(err.contains("last resource"));

        open_resource(&state, "r2".into()).await.unwrap();
        let certificate = finish_course(&state).await.unwrap();
        assert_eq!(certificate.file_name, "Certificate_Rust Basics.pdf");

        let bytes = std::fs::read(&certificate.path).unwrap();
        assert_eq!(bytes.len(), certificate.size);
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.windows(11).any(|w| w == b"(Ana Lopez)"));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
