use crate::config::Config;

pub const DEFAULT_PERSONA: &str = "Ти — розумний україномовний асистент Українського Католицького Університету (УКУ). \
Тебе звати Оленка. Відповідай на запитання, використовуючи наведений контекст. \
Відповідай коротко, чітко та ввічливо.";

pub const GROUNDING_INSTRUCTION: &str = "Використовуй виключно інформацію з блоку 'Контекст'. \
Не вигадуй. Якщо інформації в контексті недостатньо — скажи про це прямо.";

pub const CONTEXT_HEADING: &str = "Контекст:";
pub const QUESTION_HEADING: &str = "Питання:";
pub const ANSWER_HEADING: &str = "Відповідь:";

/// Appended by the model when the answer implies an administrative action.
pub const ACTION_MARKER: &str = "[ПОТРІБНА_ДІЯ]";

pub const FORMAT_HINT: &str = "Відформатуй результат у HTML (використовуй <p>, <ul>, <li>, <strong>, якщо доречно), до 100 слів.";

pub const GREETING_PROMPT: &str = "Ти онлайн асистент Українського Католицького Університету. \
Основна мова спілкування це українська та англійська. \
Відповідай коротко, чітко та ввічливо, максимум 3 речення. \
Тебе звати Оленка (жіноче ім'я). Ти допомагаєш користувачам дізнатись більше про університет.\n\n\
Привітайся і запропонуй допомогу.";

#[derive(Clone, Debug, serde::Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One-shot answers are cached, so they never carry the interactive format hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptMode {
    OneShot,
    Interactive,
}

#[derive(Clone, Debug)]
pub struct PromptBuilder {
    persona: String,
    include_format_hint: bool,
    include_action_instruction: bool,
}

impl PromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            include_format_hint: false,
            include_action_instruction: false,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.system_prompt.clone())
            .with_format_hint(cfg.include_format_hint)
            .with_action_instruction(cfg.include_action_instruction)
    }

    pub fn with_format_hint(mut self, enabled: bool) -> Self {
        self.include_format_hint = enabled;
        self
    }

    pub fn with_action_instruction(mut self, enabled: bool) -> Self {
        self.include_action_instruction = enabled;
        self
    }

    /// Assembles the prompt. No truncation happens here; callers budget the result.
    pub fn build(&self, context: &str, question: &str, mode: PromptMode) -> String {
        let mut prompt = String::with_capacity(
            self.persona.len() + context.len() + question.len() + 512,
        );
        prompt.push_str(&self.persona);
        prompt.push('\n');
        prompt.push_str(GROUNDING_INSTRUCTION);
        prompt.push_str("\n\n");

        prompt.push_str(CONTEXT_HEADING);
        prompt.push('\n');
        prompt.push_str(context);
        prompt.push_str("\n\n");

        prompt.push_str(QUESTION_HEADING);
        prompt.push(' ');
        prompt.push_str(question);
        prompt.push('\n');

        if self.include_action_instruction {
            prompt.push_str(&action_instruction());
            prompt.push('\n');
        }
        if self.include_format_hint && mode == PromptMode::Interactive {
            prompt.push_str("Стиль відповіді: ");
            prompt.push_str(FORMAT_HINT);
            prompt.push('\n');
        }

        prompt.push_str(ANSWER_HEADING);
        prompt
    }
}

fn action_instruction() -> String {
    format!(
        "Якщо з відповіді випливає, що користувачу потрібно виконати адміністративну дію \
(звернутися до деканату, подати документи, написати заяву), додай у самому кінці відповіді маркер {ACTION_MARKER}."
    )
}

/// Splits a finished answer into its text and whether the action marker was present.
pub fn strip_action_marker(answer: &str) -> (String, bool) {
    match answer.rfind(ACTION_MARKER) {
        Some(pos) => {
            let mut text = String::with_capacity(answer.len());
            text.push_str(&answer[..pos]);
            text.push_str(&answer[pos + ACTION_MARKER.len()..]);
            (text.trim_end().to_string(), true)
        }
        None => (answer.to_string(), false),
    }
}
