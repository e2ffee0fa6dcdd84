//! # Messages
//!
//! User-facing survey texts: greeting, questions, completion, and the statistics report.

pub const START_COMMAND: &str = "/start";
pub const STAT_COMMAND: &str = "/stat";

pub fn greeting(name: &str) -> String {
    format!(
        "Привет {name}! 👋\n\n\
         Спасибо за интерес к теме ERP и CRM.\n\n\
         Чтобы получить максимальную пользу от мероприятия, просим ответить на пару простых вопросов. \
         Это займет всего минуту!\n\n\
         Готовы? Тогда начнём."
    )
}

pub const QUESTION_1: &str = "1. К какой категории вы бы себя отнесли?\n\
    Нажмите кнопку с вариантом ответа внизу, либо напишите свой вариант.";

pub const QUESTION_1_OPTIONS: [&str; 4] = [
    "Предприниматель",
    "Наёмный руководитель",
    "Специалист IT",
    "Специалист, не IT",
];

pub const QUESTION_2: &str =
    "2. Собираетесь ли вы внедрять новые ERP/CRM системы на вашем предприятии в ближайшее время?";

pub const QUESTION_2_OPTIONS: [&str; 2] = ["Да", "Нет"];

pub const FINISH: &str = "Благодарим вас за участие!\n\n\
    Если у вас есть вопросы или вы хотите сообщить дополнительную информацию организаторам, \
    - можете написать в этом чате.";

pub const EXTRA_ACK: &str = "Ваше сообщение будет передано организаторам.";

pub fn admin_notice() -> String {
    format!("Для вас доступна функция статистики {STAT_COMMAND}")
}

pub const SUGGESTED_ANSWERS: &str = "Варианты ответа:";

pub const STATS_HEADER: &str = "Статистика регистраций:";

pub fn registered_count(count: usize) -> String {
    format!("Зарегистрировано {count} участников.")
}
