mod config;
mod error;
mod history;
mod quiz;
mod report;

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use config::Config;
use dotenv::dotenv;
use history::{HistoryStore, JsonHistoryStore};
use error::SessionError;
use log::{debug, info, warn};
use quiz::{bank::QuestionBank, session::QuizSession, ResultEntry};
use rand::{rngs::StdRng, SeedableRng};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, ParseMode},
    utils::html::escape,
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;
type HandlerResult = Result<(), BoxError>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveName,
    ReceivePin {
        name: String,
    },
    Menu {
        user: String,
    },
    Quiz {
        user: String,
        session: QuizSession,
    },
}

type DialogueStorage = Arc<ErasedStorage<State>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();
    info!("Starting adaptive quiz bot...");

    let config = Config::from_env()?;
    config.ensure_data_files()?;

    let bank = QuestionBank::open(&config.questions_file)?;
    if bank.is_empty() {
        warn!(
            "{} has no questions, every quiz will end immediately",
            config.questions_file.display()
        );
    }
    info!("Loaded {} questions", bank.len());

    let history = JsonHistoryStore::new(&config.results_file);
    info!("Keeping results in {}", history.path().display());
    let history: Arc<dyn HistoryStore> = Arc::new(history);

    let storage: DialogueStorage = SqliteStorage::open(&config.dialogue_db, Json)
        .await?
        .erase();
    info!("Dialogue state in {}", config.dialogue_db);

    let bot = Bot::from_env();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveName].endpoint(receive_name))
            .branch(dptree::case![State::ReceivePin { name }].endpoint(receive_pin))
            .branch(dptree::case![State::Menu { user }].endpoint(menu))
            .branch(dptree::case![State::Quiz { user, session }].endpoint(quiz_answer)),
    )
    .dependencies(dptree::deps![
        storage,
        Arc::new(bank),
        history,
        Arc::new(config)
    ])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

const START_QUIZ: &str = "Start quiz";
const SHOW_HISTORY: &str = "My history";
const SHOW_REPORT: &str = "Last report";
const RESTART_COMMAND: &str = "/start";

fn menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(START_QUIZ)],
        vec![
            KeyboardButton::new(SHOW_HISTORY),
            KeyboardButton::new(SHOW_REPORT),
        ],
    ])
}

const GREETING_TEXT: &str = "Hi! This is an adaptive reasoning quiz. Questions get harder when you answer right and easier when you miss. What is your name?";
async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;

    dialogue.update(State::ReceiveName).await?;
    Ok(())
}

async fn receive_name(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    match msg.text().map(str::trim).filter(|t| !t.is_empty()) {
        Some(name) => {
            bot.send_message(msg.chat.id, "Now send your PIN.").await?;
            dialogue
                .update(State::ReceivePin {
                    name: name.to_string(),
                })
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please send your name as text.")
                .await?;
        }
    }
    Ok(())
}

async fn receive_pin(bot: Bot, dialogue: QuizDialogue, name: String, msg: Message) -> HandlerResult {
    if msg.text().map(str::trim).filter(|t| !t.is_empty()).is_none() {
        bot.send_message(msg.chat.id, "Please fill in your PIN.").await?;
        return Ok(());
    }

    bot.send_message(
        msg.chat.id,
        format!("Welcome, {}! What would you like to do?", escape(&name)),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(menu_keyboard())
    .await?;

    dialogue.update(State::Menu { user: name }).await?;
    Ok(())
}

async fn menu(
    bot: Bot,
    dialogue: QuizDialogue,
    user: String,
    msg: Message,
    bank: Arc<QuestionBank>,
    history: Arc<dyn HistoryStore>,
    config: Arc<Config>,
) -> HandlerResult {
    match msg.text() {
        Some(START_QUIZ) | Some(RESTART_COMMAND) => {
            let session = begin_quiz(&user, config.quiz_length)?;
            ask_next(&bot, &dialogue, msg.chat.id, user, session, &bank, &history).await
        }
        Some(SHOW_HISTORY) => {
            let entries = load_history(&history, &user).await?;
            bot.send_message(msg.chat.id, report::render_history(&user, &entries))
                .parse_mode(ParseMode::Html)
                .reply_markup(menu_keyboard())
                .await?;
            Ok(())
        }
        Some(SHOW_REPORT) => {
            let text = match load_history(&history, &user).await?.last() {
                Some(entry) => report::render_result(&user, entry),
                None => report::render_history(&user, &[]),
            };
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(menu_keyboard())
                .await?;
            Ok(())
        }
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options.")
                .reply_markup(menu_keyboard())
                .await?;
            Ok(())
        }
    }
}

async fn quiz_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    (user, mut session): (String, QuizSession),
    msg: Message,
    bank: Arc<QuestionBank>,
    history: Arc<dyn HistoryStore>,
    config: Arc<Config>,
) -> HandlerResult {
    // A previous finish failed to store the result; try again.
    if session.is_completed() {
        return finish_quiz(&bot, &dialogue, msg.chat.id, user, session, &history).await;
    }

    if msg.text() == Some(RESTART_COMMAND) {
        info!(
            "{} abandoned a quiz after {} answers",
            user,
            session.answers().len()
        );
        let session = begin_quiz(&user, config.quiz_length)?;
        return ask_next(&bot, &dialogue, msg.chat.id, user, session, &bank, &history).await;
    }

    let Some(question) = session.current_question() else {
        return ask_next(&bot, &dialogue, msg.chat.id, user, session, &bank, &history).await;
    };
    let Some(option_id) = msg.text().and_then(|t| question.option_id_for(t)) else {
        bot.send_message(
            msg.chat.id,
            "Please pick one of the options on the keyboard, or send /start to begin again.",
        )
        .await?;
        return Ok(());
    };
    let correct_option = question.correct_option().unwrap_or_default().to_string();

    let answered = session.submit_answer(&option_id)?;
    debug!(
        "{} streak {}, next level {}",
        user,
        session.streak(),
        session.current_level()
    );
    let reply = if answered.is_correct {
        "Correct!".to_string()
    } else {
        format!("Wrong! The right answer is <b>{}</b>.", escape(&correct_option))
    };
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;

    if session.is_completed() {
        return finish_quiz(&bot, &dialogue, msg.chat.id, user, session, &history).await;
    }
    ask_next(&bot, &dialogue, msg.chat.id, user, session, &bank, &history).await
}

fn begin_quiz(user: &str, length: usize) -> Result<QuizSession, SessionError> {
    let mut session = QuizSession::new(length);
    session.start()?;
    info!("{} started a quiz of {} questions", user, session.length());
    Ok(session)
}

/// Reads a user's history off the async workers.
async fn load_history(
    history: &Arc<dyn HistoryStore>,
    user: &str,
) -> Result<Vec<ResultEntry>, BoxError> {
    let history = Arc::clone(history);
    let user = user.to_string();
    Ok(tokio::task::spawn_blocking(move || history.read_all(&user)).await??)
}

async fn ask_next(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    user: String,
    mut session: QuizSession,
    bank: &QuestionBank,
    history: &Arc<dyn HistoryStore>,
) -> HandlerResult {
    let question = {
        let mut rng = StdRng::from_entropy();
        session.next_question(bank, &mut rng)?.cloned()
    };

    let Some(question) = question else {
        if session.answers().len() < session.length() {
            bot.send_message(
                chat_id,
                "There are no more questions available, so the quiz ends here.",
            )
            .await?;
        }
        return finish_quiz(bot, dialogue, chat_id, user, session, history).await;
    };

    let text = format!(
        "Question {}/{} ({}):\n\n{}",
        session.question_index() + 1,
        session.length(),
        question.level,
        escape(&question.text)
    );
    let keyboard = KeyboardMarkup::new(
        question
            .options
            .iter()
            .map(|o| vec![KeyboardButton::new(o.clone())])
            .collect::<Vec<_>>(),
    );
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;

    dialogue.update(State::Quiz { user, session }).await?;
    Ok(())
}

enum Finished {
    Stored(ResultEntry),
    /// The history store refused the entry; the completed session was kept for another try.
    Retry,
}

/// Stores a completed attempt and saves the next dialogue state before anything is sent.
///
/// Once the entry is in the history the dialogue has to leave the quiz, otherwise a failed
/// reply would leave the pre-answer session stored and the next message would finish it again.
async fn finish_and_persist<P, Fut>(
    user: &str,
    session: QuizSession,
    history: &Arc<dyn HistoryStore>,
    persist: P,
) -> Result<Finished, BoxError>
where
    P: FnOnce(State) -> Fut,
    Fut: Future<Output = HandlerResult>,
{
    let store = Arc::clone(history);
    let owner = user.to_string();
    let (session, result) = tokio::task::spawn_blocking(move || {
        let mut session = session;
        let result = session.finish(&owner, store.as_ref(), Utc::now());
        (session, result)
    })
    .await?;

    match result {
        Ok(entry) => {
            persist(State::Menu {
                user: user.to_string(),
            })
            .await?;
            Ok(Finished::Stored(entry))
        }
        Err(SessionError::Storage(err)) => {
            warn!(
                "could not store result for {} (session {:?}): {}",
                user,
                session.phase(),
                err
            );
            persist(State::Quiz {
                user: user.to_string(),
                session,
            })
            .await?;
            Ok(Finished::Retry)
        }
        Err(err) => Err(err.into()),
    }
}

async fn finish_quiz(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    user: String,
    session: QuizSession,
    history: &Arc<dyn HistoryStore>,
) -> HandlerResult {
    let finished =
        finish_and_persist(&user, session, history, |state: State| dialogue.update(state)).await?;

    match finished {
        Finished::Stored(entry) => {
            bot.send_message(chat_id, report::render_result(&user, &entry))
                .parse_mode(ParseMode::Html)
                .reply_markup(menu_keyboard())
                .await?;
        }
        Finished::Retry => {
            bot.send_message(chat_id, "Your result could not be saved. Send any message to retry.")
                .await?;
        }
    }
    Ok(())
}
