//! Label tables for every supported language.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Ukrainian,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Ukrainian];

    /// Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "uk" | "ua" | "uk-ua" => Language::Ukrainian,
            _ => Language::English,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Ukrainian => "uk",
        }
    }

    /// Name of the language in itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Ukrainian => "Українська",
        }
    }

    pub fn labels(self) -> &'static Labels {
        match self {
            Language::English => &ENGLISH,
            Language::Ukrainian => &UKRAINIAN,
        }
    }
}

pub struct StageLabels {
    pub language_select: &'static str,
    pub intro: &'static str,
    pub profile: &'static str,
    pub categories: &'static str,
    pub subtopics: &'static str,
    pub loading: &'static str,
    pub analyzing: &'static str,
    pub results: &'static str,
    pub error: &'static str,
    pub goodbye: &'static str,
}

pub struct ControlLabels {
    pub back: &'static str,
    pub home: &'static str,
    pub yes: &'static str,
    pub no: &'static str,
    pub begin: &'static str,
    pub edit_profile: &'static str,
    pub change_language: &'static str,
    pub preview_results: &'static str,
    pub submit_profile: &'static str,
    pub start_quiz: &'static str,
    pub hint: &'static str,
    pub play_again: &'static str,
}

pub struct ProfileLabels {
    pub gender: &'static str,
    pub age_group: &'static str,
    pub nationality: &'static str,
    pub not_set: &'static str,
    pub female: &'static str,
    pub male: &'static str,
    pub other: &'static str,
}

pub struct PromptLabels {
    pub confirm_exit: &'static str,
    pub confirm_home: &'static str,
}

pub struct QuizLabels {
    pub question: &'static str,
    pub topic: &'static str,
    pub difficulty: &'static str,
    pub selected: &'static str,
    pub no_hint: &'static str,
}

pub struct ResultLabels {
    pub score: &'static str,
    pub percentile: &'static str,
    pub demographic_percentile: &'static str,
    pub best: &'static str,
    pub rating: &'static str,
    pub correct: &'static str,
    pub wrong: &'static str,
    pub no_history: &'static str,
}

pub struct Labels {
    pub stage: StageLabels,
    pub control: ControlLabels,
    pub profile: ProfileLabels,
    pub prompt: PromptLabels,
    pub quiz: QuizLabels,
    pub result: ResultLabels,
}

impl ControlLabels {
    pub fn all(&self) -> [&'static str; 12] {
        [
            self.back,
            self.home,
            self.yes,
            self.no,
            self.begin,
            self.edit_profile,
            self.change_language,
            self.preview_results,
            self.submit_profile,
            self.start_quiz,
            self.hint,
            self.play_again,
        ]
    }
}

impl Labels {
    /// Whether `text` is one of this table's keyboard buttons.
    pub fn has_button(&self, text: &str) -> bool {
        let profile = [self.profile.female, self.profile.male, self.profile.other];
        self.control.all().into_iter().chain(profile).any(|label| label == text)
    }
}

/// Keyboard text in any supported language, including the language picker.
pub fn is_button_label(text: &str) -> bool {
    let text = text.trim();
    Language::ALL
        .into_iter()
        .any(|language| language.native_name() == text || language.labels().has_button(text))
}

static ENGLISH: Labels = Labels {
    stage: StageLabels {
        language_select: "Choose your language",
        intro: "Welcome to Trivia Trail! Pick topics, answer AI-generated questions and see how you compare.",
        profile: "Tell us about yourself. Every field is optional; type your nationality or pick from the buttons.",
        categories: "Choose a category",
        subtopics: "Pick up to 4 subtopics, then start the quiz",
        loading: "Generating your questions...",
        analyzing: "Analyzing your answers...",
        results: "Your results",
        error: "Something went wrong",
        goodbye: "Bye! Send /start to play again.",
    },
    control: ControlLabels {
        back: "⬅️ Back",
        home: "🏠 Home",
        yes: "Yes",
        no: "No",
        begin: "▶️ Play",
        edit_profile: "👤 Profile",
        change_language: "🌐 Language",
        preview_results: "📊 Last results",
        submit_profile: "✔️ Continue",
        start_quiz: "🚀 Start quiz",
        hint: "💡 Hint",
        play_again: "🔁 Play again",
    },
    profile: ProfileLabels {
        gender: "Gender",
        age_group: "Age",
        nationality: "Nationality",
        not_set: "not set",
        female: "Female",
        male: "Male",
        other: "Other",
    },
    prompt: PromptLabels {
        confirm_exit: "Leave Trivia Trail?",
        confirm_home: "Return home? Your current progress will be lost.",
    },
    quiz: QuizLabels {
        question: "Question",
        topic: "Topic",
        difficulty: "Difficulty",
        selected: "Selected",
        no_hint: "No hint for this one.",
    },
    result: ResultLabels {
        score: "Score",
        percentile: "Better than",
        demographic_percentile: "Better than your peers",
        best: "Best",
        rating: "Rating",
        correct: "correct",
        wrong: "wrong",
        no_history: "No games played yet.",
    },
};

static UKRAINIAN: Labels = Labels {
    stage: StageLabels {
        language_select: "Обери мову",
        intro: "Вітаємо у Trivia Trail! Обирай теми, відповідай на питання від ШІ та порівнюй себе з іншими.",
        profile: "Розкажи про себе. Усі поля необов'язкові; напиши свою національність або обери кнопку.",
        categories: "Обери категорію",
        subtopics: "Обери до 4 підтем і починай квіз",
        loading: "Генеруємо питання...",
        analyzing: "Аналізуємо відповіді...",
        results: "Твої результати",
        error: "Щось пішло не так",
        goodbye: "Бувай! Надішли /start, щоб зіграти ще.",
    },
    control: ControlLabels {
        back: "⬅️ Назад",
        home: "🏠 Додому",
        yes: "Так",
        no: "Ні",
        begin: "▶️ Грати",
        edit_profile: "👤 Профіль",
        change_language: "🌐 Мова",
        preview_results: "📊 Останні результати",
        submit_profile: "✔️ Далі",
        start_quiz: "🚀 Почати квіз",
        hint: "💡 Підказка",
        play_again: "🔁 Ще раз",
    },
    profile: ProfileLabels {
        gender: "Стать",
        age_group: "Вік",
        nationality: "Національність",
        not_set: "не вказано",
        female: "Жінка",
        male: "Чоловік",
        other: "Інше",
    },
    prompt: PromptLabels {
        confirm_exit: "Вийти з Trivia Trail?",
        confirm_home: "Повернутися на головну? Поточний прогрес буде втрачено.",
    },
    quiz: QuizLabels {
        question: "Питання",
        topic: "Тема",
        difficulty: "Складність",
        selected: "Обрано",
        no_hint: "Для цього питання підказки немає.",
    },
    result: ResultLabels {
        score: "Бали",
        percentile: "Краще за",
        demographic_percentile: "Краще за однолітків",
        best: "Рекорд",
        rating: "Рейтинг",
        correct: "правильно",
        wrong: "неправильно",
        no_history: "Ще жодної гри.",
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_codes_fall_back_to_english() {
        assert_eq!(Language::from_code("fr"), Language::English);
        assert_eq!(Language::from_code("UK"), Language::Ukrainian);
        assert_eq!(Language::from_code("fr").labels().control.yes, "Yes");
    }

    #[test]
    fn back_and_home_differ_in_every_language() {
        for language in Language::ALL {
            let control = &language.labels().control;
            assert_ne!(control.back, control.home);
            assert_ne!(control.yes, control.no);
        }
    }

    #[test]
    fn buttons_are_recognised_across_languages() {
        assert!(is_button_label(ENGLISH.control.home));
        assert!(is_button_label(UKRAINIAN.control.home));
        assert!(is_button_label(&format!(" {} ", UKRAINIAN.profile.female)));
        assert!(is_button_label(Language::Ukrainian.native_name()));
        assert!(!is_button_label("Ukraine"));
        assert!(ENGLISH.has_button(ENGLISH.control.submit_profile));
        assert!(!ENGLISH.has_button(UKRAINIAN.control.submit_profile));
    }
}
