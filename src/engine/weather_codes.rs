//! WMO weather-code labels.
//!
//! Labels are the Russian descriptions already stored in the `weather`
//! table, so new rows stay comparable with historical ones.

/// Label for codes not in [`WEATHER_CODES`].
pub const UNKNOWN_LABEL: &str = "Неизвестно";

/// Every code Open-Meteo documents, with its label.
pub const WEATHER_CODES: &[(i64, &str)] = &[
    (0, "Ясно"),
    (1, "Преимущественно ясно"),
    (2, "Переменная облачность"),
    (3, "Пасмурно"),
    (45, "Туман"),
    (48, "Туман с инеем"),
    (51, "Морось: слабая"),
    (53, "Морось: умеренная"),
    (55, "Морось: сильная"),
    (56, "Ледяная морось: слабая"),
    (57, "Ледяная морось: сильная"),
    (61, "Дождь: слабый"),
    (63, "Дождь: умеренный"),
    (65, "Дождь: сильный"),
    (66, "Ледяной дождь: слабый"),
    (67, "Ледяной дождь: сильный"),
    (71, "Снег: слабый"),
    (73, "Снег: умеренный"),
    (75, "Снег: сильный"),
    (77, "Снежные зерна"),
    (80, "Ливни: слабые"),
    (81, "Ливни: умеренные"),
    (82, "Ливни: сильные"),
    (85, "Снегопад: слабый"),
    (86, "Снегопад: сильный"),
    (95, "Гроза"),
    (96, "Гроза со слабым градом"),
    (99, "Гроза с сильным градом"),
];

/// Human-readable label for a weather code. Never fails.
pub fn describe(code: i64) -> &'static str {
    WEATHER_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or(UNKNOWN_LABEL)
}

/// Same as [`describe`], treating a null code as unknown.
pub fn describe_opt(code: Option<i64>) -> &'static str {
    code.map(describe).unwrap_or(UNKNOWN_LABEL)
}
