use std::sync::Arc;

use chatgpt::{client::ChatGPT, config::ChatGPTEngine};
use dotenv::dotenv;
use log::{debug, info, warn};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup, KeyboardRemove},
};
use trivia_trail::{
    config::Config,
    game::{Game, GameSettings},
    history::MemoryHistory,
    i18n::{Labels, Language},
    navigation::PromptKind,
    profile::{AgeGroup, Gender, JsonFileStore, STORAGE_KEY},
    quiz::{
        ai_helper::{ContentProvider, QuizHelper},
        session::Settled,
        Difficulty,
    },
    stage::{SelectionPhase, Stage},
    topics,
};

type GameDialogue = Dialogue<Game, ErasedStorage<Game>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type GameStorage = Arc<ErasedStorage<Game>>;

struct Services {
    provider: QuizHelper,
    profiles: JsonFileStore,
    config: Config,
}

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    pretty_env_logger::init();

    let config = Config::from_env()?;
    info!("Starting trivia bot...");

    let bot = Bot::from_env();

    debug!("Opening dialogue storage at {}", config.dialogue_db);
    let storage: GameStorage = SqliteStorage::open(&config.dialogue_db, Json)
        .await?
        .erase();

    let gpt = {
        let mut gpt = ChatGPT::new(config.chatgpt_api_key.clone())?;

        gpt.config.engine = ChatGPTEngine::Gpt35Turbo;
        gpt.config.timeout = config.request_timeout;

        gpt
    };

    let services = Arc::new(Services {
        provider: QuizHelper::new(gpt, config.persona),
        profiles: JsonFileStore::new(&config.profile_dir),
        config,
    });

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<Game>, Game>()
            .endpoint(handle_message),
    )
    .dependencies(dptree::deps![storage, services])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

fn new_game(services: &Services, chat_id: ChatId) -> Game {
    let mut game = Game::load(
        MemoryHistory::new().closable(),
        &services.profiles,
        format!("{STORAGE_KEY}_{}", chat_id.0),
        GameSettings {
            difficulty: services.config.difficulty,
            questions_per_topic: services.config.questions_per_topic,
        },
    );
    game.start();
    game
}

async fn handle_message(
    bot: Bot,
    dialogue: GameDialogue,
    mut game: Game,
    services: Arc<Services>,
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        render(&bot, &game, msg.chat.id).await?;
        return Ok(());
    };

    if text == "/start" || !game.is_started() {
        game = new_game(&services, msg.chat.id);
    } else {
        apply(&bot, &dialogue, &mut game, &services, msg.chat.id, text).await?;
    }

    if game.has_exited() {
        bot.send_message(msg.chat.id, game.labels().stage.goodbye)
            .reply_markup(KeyboardRemove::new())
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    render(&bot, &game, msg.chat.id).await?;
    dialogue.update(game).await?;
    Ok(())
}

/// Turns one keyboard press (or typed text) into a game action.
async fn apply(
    bot: &Bot,
    dialogue: &GameDialogue,
    game: &mut Game,
    services: &Services,
    chat_id: ChatId,
    text: &str,
) -> HandlerResult {
    let labels = game.labels();

    if game.prompt().is_some() {
        match text {
            t if t == labels.control.yes => {
                game.answer_prompt(true);
            }
            t if t == labels.control.no => {
                game.answer_prompt(false);
            }
            _ => debug!("prompt open, ignoring {text:?}"),
        }
        return Ok(());
    }

    if text == labels.control.back {
        game.request_back();
        return Ok(());
    }
    if text == labels.control.home {
        game.request_home();
        return Ok(());
    }

    match game.stage() {
        Stage::LanguageSelect => {
            if let Some(language) = Language::ALL.into_iter().find(|l| l.native_name() == text) {
                game.choose_language(language, &services.profiles);
            }
        }
        Stage::Intro => match text {
            t if t == labels.control.begin => {
                game.begin();
            }
            t if t == labels.control.edit_profile => {
                game.edit_profile();
            }
            t if t == labels.control.change_language => {
                game.change_language();
            }
            t if t == labels.control.preview_results => {
                game.preview_results();
            }
            _ => {}
        },
        Stage::Profile => {
            if text == labels.control.submit_profile {
                game.submit_profile(&services.profiles);
            } else if let Some(gender) = Gender::ALL
                .into_iter()
                .find(|g| gender_label(labels, *g) == text)
            {
                game.set_gender(Some(gender));
            } else if let Some(age) = AgeGroup::ALL.into_iter().find(|a| a.label() == text) {
                game.set_age_group(Some(age));
            } else {
                game.set_nationality(text);
            }
        }
        Stage::TopicSelection => match game.phase() {
            SelectionPhase::Category => {
                if let Some(category) = topics::category_by_label(text) {
                    game.open_category(category.id);
                } else if let Ok(difficulty) = text.parse::<Difficulty>() {
                    game.set_difficulty(difficulty);
                }
            }
            SelectionPhase::Subtopic => {
                if text == labels.control.start_quiz {
                    load_quiz(bot, dialogue, game, services, chat_id).await?;
                } else if let Some(topic) = game
                    .picker()
                    .category()
                    .and_then(|c| c.topic_by_label(text))
                {
                    game.toggle_subtopic(topic);
                }
            }
        },
        Stage::Quiz => {
            if text == labels.control.hint {
                let hint = game
                    .reveal_hint()
                    .unwrap_or(labels.quiz.no_hint)
                    .to_string();
                bot.send_message(chat_id, hint).await?;
            } else if game.select_option(text) {
                submit_answer(bot, dialogue, game, services, chat_id).await?;
            }
        }
        Stage::Results | Stage::Error => {
            if text == labels.control.play_again {
                game.play_again();
            }
        }
        Stage::LoadingQuiz | Stage::Analyzing => debug!("busy, ignoring {text:?}"),
    }
    Ok(())
}

async fn load_quiz(
    bot: &Bot,
    dialogue: &GameDialogue,
    game: &mut Game,
    services: &Services,
    chat_id: ChatId,
) -> HandlerResult {
    let Some(request) = game.start_quiz() else {
        return Ok(());
    };
    dialogue.update(game.clone()).await?;
    render(bot, game, chat_id).await?;

    // Only cosmetic, so a failure here is fine
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let response = services.provider.generate_questions(&request.request).await;
    game.receive_questions(request.token, response);
    Ok(())
}

async fn submit_answer(
    bot: &Bot,
    dialogue: &GameDialogue,
    game: &mut Game,
    services: &Services,
    chat_id: ChatId,
) -> HandlerResult {
    let Some(ticket) = game.confirm_answer() else {
        return Ok(());
    };
    if let Some(answer) = game.session().answers().last() {
        let verdict = if answer.is_correct {
            format!("✅ {}", answer.selected)
        } else {
            format!("❌ {} ({})", answer.selected, answer.correct)
        };
        bot.send_message(chat_id, verdict).await?;
    }

    tokio::time::sleep(services.config.settle_delay).await;
    if !matches!(game.settle(ticket), Settled::BatchComplete(_)) {
        return Ok(());
    }

    let Some(request) = game.begin_evaluation(&services.profiles) else {
        return Ok(());
    };
    dialogue.update(game.clone()).await?;
    render(bot, game, chat_id).await?;
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let response = services
        .provider
        .evaluate_batch(&request.reports, &request.profile, request.language)
        .await;
    game.receive_evaluation(request.token, &request.reports, response);
    Ok(())
}

fn gender_label(labels: &Labels, gender: Gender) -> &'static str {
    match gender {
        Gender::Female => labels.profile.female,
        Gender::Male => labels.profile.male,
        Gender::Other => labels.profile.other,
    }
}

fn keyboard(rows: Vec<Vec<String>>) -> KeyboardMarkup {
    KeyboardMarkup::new(
        rows.into_iter()
            .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
    )
}

async fn render(bot: &Bot, game: &Game, chat_id: ChatId) -> HandlerResult {
    let labels = game.labels();
    let control = &labels.control;
    let back = control.back.to_string();
    let home = control.home.to_string();

    if let Some(prompt) = game.prompt() {
        let text = match prompt.kind {
            PromptKind::ConfirmExit => labels.prompt.confirm_exit,
            PromptKind::ConfirmReturnHome => labels.prompt.confirm_home,
        };
        bot.send_message(chat_id, text)
            .reply_markup(keyboard(vec![vec![
                control.yes.to_string(),
                control.no.to_string(),
            ]]))
            .await?;
        return Ok(());
    }

    let (text, rows) = match game.stage() {
        Stage::LanguageSelect => (
            labels.stage.language_select.to_string(),
            vec![Language::ALL
                .iter()
                .map(|l| l.native_name().to_string())
                .collect::<Vec<_>>()],
        ),
        Stage::Intro => {
            let mut row = vec![control.begin.to_string(), control.edit_profile.to_string()];
            if !game.profile().history.is_empty() {
                row.push(control.preview_results.to_string());
            }
            (
                labels.stage.intro.to_string(),
                vec![row, vec![control.change_language.to_string()]],
            )
        }
        Stage::Profile => (
            profile_text(game),
            vec![
                Gender::ALL
                    .iter()
                    .map(|g| gender_label(labels, *g).to_string())
                    .collect(),
                AgeGroup::ALL.iter().map(|a| a.label().to_string()).collect(),
                vec![back, control.submit_profile.to_string()],
            ],
        ),
        Stage::TopicSelection => match game.phase() {
            SelectionPhase::Category => (
                format!(
                    "{}\n{}: {}",
                    labels.stage.categories,
                    labels.quiz.difficulty,
                    game.settings().difficulty
                ),
                topics::CATALOG
                    .chunks(2)
                    .map(|pair| pair.iter().map(|c| c.label.to_string()).collect::<Vec<_>>())
                    .chain([
                        Difficulty::ALL.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
                        vec![back, home],
                    ])
                    .collect(),
            ),
            SelectionPhase::Subtopic => {
                let selected = game
                    .picker()
                    .selected()
                    .iter()
                    .map(|t| t.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut rows: Vec<Vec<String>> = game
                    .picker()
                    .category()
                    .map(|c| c.topics().map(|t| vec![t.label]).collect())
                    .unwrap_or_default();
                rows.push(vec![back, control.start_quiz.to_string()]);
                (
                    format!("{}\n{}: {selected}", labels.stage.subtopics, labels.quiz.selected),
                    rows,
                )
            }
        },
        Stage::LoadingQuiz => {
            bot.send_message(chat_id, labels.stage.loading)
                .reply_markup(KeyboardRemove::new())
                .await?;
            return Ok(());
        }
        Stage::Quiz => {
            let Some(question) = game.current_question() else {
                warn!("quiz stage without an active question");
                return Ok(());
            };
            let progress = game.session().progress();
            let number = game.session().question_index().map_or(0, |i| i + 1);
            let count = game
                .session()
                .current_set()
                .map_or(0, |set| set.questions.len());
            let text = format!(
                "{}: {} ({}/{})\n{} {number}/{count}\n\n{}",
                labels.quiz.topic,
                progress.current_label().unwrap_or_default(),
                progress.current,
                progress.total,
                labels.quiz.question,
                question.text,
            );
            let mut rows: Vec<Vec<String>> =
                question.options.iter().map(|o| vec![o.clone()]).collect();
            rows.push(vec![control.hint.to_string(), home]);
            (text, rows)
        }
        Stage::Analyzing => {
            bot.send_message(chat_id, labels.stage.analyzing)
                .reply_markup(KeyboardRemove::new())
                .await?;
            return Ok(());
        }
        Stage::Results => (
            results_text(game),
            vec![vec![control.play_again.to_string(), home]],
        ),
        Stage::Error => (
            format!(
                "{}\n{}",
                labels.stage.error,
                game.error().unwrap_or_default()
            ),
            vec![vec![control.play_again.to_string(), home]],
        ),
    };

    bot.send_message(chat_id, text)
        .reply_markup(keyboard(rows))
        .await?;
    Ok(())
}

fn profile_text(game: &Game) -> String {
    let labels = game.labels();
    let profile = game.profile();
    let not_set = labels.profile.not_set;
    format!(
        "{}\n\n{}: {}\n{}: {}\n{}: {}",
        labels.stage.profile,
        labels.profile.gender,
        profile
            .gender
            .map_or(not_set, |g| gender_label(labels, g)),
        labels.profile.age_group,
        profile.age_group.map_or(not_set, AgeGroup::label),
        labels.profile.nationality,
        profile.nationality.as_deref().unwrap_or(not_set),
    )
}

fn results_text(game: &Game) -> String {
    let labels = game.labels();
    let result = &labels.result;
    let profile = game.profile();
    let mut text = format!("{}\n", labels.stage.results);

    if game.results().is_empty() {
        // Preview: the topics of the most recent session.
        let Some(last) = profile.history.last() else {
            text.push_str(result.no_history);
            return text;
        };
        for record in profile.history.iter().filter(|r| r.timestamp == last.timestamp) {
            text.push_str(&format!(
                "\n{}: {} {}% ({}), {} {}",
                record.topic_id,
                result.score,
                record.score,
                record.difficulty,
                result.rating,
                profile.rating(&record.topic_id),
            ));
        }
        return text;
    }

    for evaluation in game.results() {
        text.push_str(&format!(
            "\n<{}>\n{} {}% · {} {} · {} {}%\n{} {}% · {} {}%\n",
            evaluation.topic.label,
            result.score,
            evaluation.score,
            result.rating,
            profile.rating(&evaluation.topic.id),
            result.best,
            profile
                .best_scores
                .get(&evaluation.topic.label)
                .copied()
                .unwrap_or(evaluation.score),
            result.percentile,
            evaluation.percentile,
            result.demographic_percentile,
            evaluation.demographic_percentile,
        ));
        for comparison in &evaluation.comparisons {
            text.push_str(&format!("• {comparison}\n"));
        }
        for review in &evaluation.details {
            let verdict = if review.is_correct {
                format!("✅ {}", result.correct)
            } else {
                format!("❌ {}", result.wrong)
            };
            text.push_str(&format!("{verdict}: {}", review.commentary));
            if let Some(correction) = &review.correction {
                text.push_str(&format!(" ({correction})"));
            }
            text.push('\n');
        }
    }
    text
}
