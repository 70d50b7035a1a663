use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use brightmind_lib::commands::{self, Direction, QuizViewDto, ResourceViewDto};
use brightmind_lib::services::content::ResourceContent;
use brightmind_lib::services::progress::CourseProgress;
use brightmind_lib::{AppConfig, AppState};

const HELP: &str = "\
commands:
  login <email> <password>   start a session
  logout                     end the session
  courses                    list all courses
  my-courses                 list your courses
  open <resource-id>         open a resource
  answer <n>                 select option n of the current question
  next | prev                move through the quiz
  retake                     start the quiz again
  goto next|prev             open the next or previous resource
  finish                     issue the certificate (last resource only)
  help                       show this text
  quit                       leave";

fn print_quiz(quiz: &QuizViewDto) {
    if quiz.completed {
        println!(
            "Quiz completed: {} correct, {} incorrect",
            quiz.correct, quiz.incorrect
        );
        return;
    }
    println!("Question {}/{}: {}", quiz.index + 1, quiz.total, quiz.question);
    for (i, option) in quiz.options.iter().enumerate() {
        let marker = if quiz.selected.as_deref() == Some(option.as_str()) {
            "*"
        } else {
            " "
        };
        println!("  {}{}. {}", marker, i + 1, option);
    }
}

fn print_view(view: &ResourceViewDto) {
    println!();
    if let Some(course) = &view.course_title {
        println!("{}", course);
    }
    println!("== {} ==", view.title);
    if let Some(progress) = &view.progress {
        let bar = CourseProgress::new(progress.position - 1, progress.total).render_bar(20);
        println!("{} ({} of {})", bar, progress.position, progress.total);
    }
    if !view.description.is_empty() {
        println!("{}", view.description);
    }
    match &view.content {
        ResourceContent::Video { embed_url, source } => {
            println!("Video: {}", embed_url.as_deref().unwrap_or(source))
        }
        ResourceContent::Pdf { url } => println!("PDF: {}", url),
        ResourceContent::Image { url } => println!("Image: {}", url),
        ResourceContent::Unavailable => println!("No content available"),
    }
    if let Some(quiz) = &view.quiz {
        print_quiz(quiz);
    }
    if view.is_last {
        println!("Last resource of the course, type `finish` for your certificate.");
    }
}

fn report<T>(result: Result<T, String>, show: impl FnOnce(T)) {
    match result {
        Ok(value) => show(value),
        Err(message) => println!("! {}", message),
    }
}

async fn run_line(state: &AppState, line: &str) -> bool {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [] => {}
        ["help"] => println!("{}", HELP),
        ["quit"] | ["exit"] => return false,
        ["login", email, password] => report(
            commands::login(state, email.to_string(), password.to_string()).await,
            |s| println!("Welcome, {} ({})", s.username, s.role),
        ),
        ["logout"] => report(commands::logout(state).await, |m| println!("{}", m.message)),
        ["courses"] => report(commands::list_courses(state).await, |courses| {
            for course in courses {
                println!("{}  {} [{}]", course.id, course.title, course.category);
            }
        }),
        ["my-courses"] => report(commands::my_courses(state).await, |courses| {
            for course in courses {
                println!("{}  {}", course.id, course.title);
            }
        }),
        ["open", id] => report(commands::open_resource(state, id.to_string()).await, |view| {
            if let Some(view) = view {
                print_view(&view)
            }
        }),
        ["answer", n] => match n.parse::<usize>() {
            Ok(n) if n > 0 => report(commands::select_answer(state, n - 1).await, |quiz| {
                print_quiz(&quiz)
            }),
            _ => println!("! usage: answer <option number>"),
        },
        ["next"] => report(commands::next_question(state).await, |step| {
            if let Some(warning) = &step.warning {
                println!("! {}", warning);
            }
            print_quiz(&step.quiz);
        }),
        ["prev"] => report(commands::previous_question(state).await, |quiz| {
            print_quiz(&quiz)
        }),
        ["retake"] => report(commands::retake_quiz(state).await, |quiz| print_quiz(&quiz)),
        ["goto", direction] => {
            let direction = match *direction {
                "next" => Direction::Next,
                "prev" => Direction::Previous,
                _ => {
                    println!("! usage: goto next|prev");
                    return true;
                }
            };
            report(commands::go_to_sibling(state, direction).await, |view| {
                if let Some(view) = view {
                    print_view(&view)
                }
            });
        }
        ["finish"] => report(commands::finish_course(state).await, |certificate| {
            println!("Certificate saved to {}", certificate.path.display())
        }),
        _ => println!("! unknown command, type `help`"),
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();
    brightmind_lib::utils::init_logging(config.log_level)?;
    log::info!("BrightMind client {} using {}", env!("CARGO_PKG_VERSION"), config.api_url);

    let state = AppState::connect(config)?;
    println!("BrightMind client, type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !run_line(&state, line.trim()).await {
            break;
        }
    }
    Ok(())
}
