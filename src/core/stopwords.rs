//! Stop-word table for the address cutoff stage.
//!
//! Each entry is a regex fragment matched case-insensitively. A fragment that
//! ends in a letter or digit only matches a whole word; fragments ending in
//! `.` or a quantifier match as written. When several entries start at the
//! same position the lower `priority` wins (it only decides which rule is
//! reported, the cut itself is the same).

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopCategory {
    BuildingInterior,
    MedicalInstitution,
    EntityMarker,
    Tourism,
    Connective,
    Cadastral,
}

#[derive(Debug, Clone, Copy)]
pub struct StopWord {
    pub category: StopCategory,
    pub pattern: &'static str,
    pub priority: u8,
}

const fn stop(category: StopCategory, pattern: &'static str, priority: u8) -> StopWord {
    StopWord {
        category,
        pattern,
        priority,
    }
}

use StopCategory::*;

pub static STOP_WORDS: &[StopWord] = &[
    // сградни части: етаж, апартамент, кабинет...
    stop(BuildingInterior, r"ет\.", 10),
    stop(BuildingInterior, r"етаж", 10),
    stop(BuildingInterior, r"ап\.", 10),
    stop(BuildingInterior, r"апартамент", 10),
    stop(BuildingInterior, r"каб\.", 10),
    stop(BuildingInterior, r"кабинет\p{L}*", 10),
    stop(BuildingInterior, r"стая", 10),
    stop(BuildingInterior, r"стаи", 10),
    stop(BuildingInterior, r"офис", 10),
    stop(BuildingInterior, r"помещение", 10),
    stop(BuildingInterior, r"помещения", 10),
    stop(BuildingInterior, r"партер", 10),
    stop(BuildingInterior, r"сутерен", 10),
    stop(BuildingInterior, r"мецанин", 10),
    stop(BuildingInterior, r"маг\.", 10),
    stop(BuildingInterior, r"магазин", 10),
    stop(BuildingInterior, r"обект", 10),
    stop(BuildingInterior, r"вх\.", 12),
    stop(BuildingInterior, r"вход", 12),
    stop(BuildingInterior, r"секция", 12),
    stop(BuildingInterior, r"зала", 12),
    stop(BuildingInterior, r"крило", 12),
    // медицински заведения
    stop(MedicalInstitution, r"УМБАЛ", 20),
    stop(MedicalInstitution, r"МБАЛ", 20),
    stop(MedicalInstitution, r"СБАЛ", 20),
    stop(MedicalInstitution, r"ДКЦ", 20),
    stop(MedicalInstitution, r"МДЦ", 20),
    stop(MedicalInstitution, r"МЦ", 21),
    stop(MedicalInstitution, r"ДЦ", 21),
    stop(MedicalInstitution, r"АИПСМП", 20),
    stop(MedicalInstitution, r"АИПМП", 20),
    stop(MedicalInstitution, r"АПМП", 20),
    stop(MedicalInstitution, r"ГПСМП", 20),
    stop(MedicalInstitution, r"ГППМП", 20),
    stop(MedicalInstitution, r"ИПСМП", 20),
    stop(MedicalInstitution, r"ИППМП", 20),
    stop(MedicalInstitution, r"АПЗЗ", 20),
    stop(MedicalInstitution, r"СМДЛ", 20),
    stop(MedicalInstitution, r"ЦСМП", 20),
    stop(MedicalInstitution, r"ЦПЗ", 20),
    stop(MedicalInstitution, r"КОЦ", 20),
    stop(MedicalInstitution, r"поликлиника", 22),
    stop(MedicalInstitution, r"болница", 22),
    stop(MedicalInstitution, r"здравна служба", 22),
    stop(MedicalInstitution, r"здравен пункт", 22),
    stop(MedicalInstitution, r"амбулатори\p{L}*", 22),
    stop(MedicalInstitution, r"лаборатори\p{L}*", 22),
    stop(MedicalInstitution, r"аптека", 22),
    stop(MedicalInstitution, r"медицинск\p{L}* център", 22),
    stop(MedicalInstitution, r"диагностично", 22),
    // административни, учебни и търговски субекти
    stop(EntityMarker, r"ЕООД", 30),
    stop(EntityMarker, r"ООД", 30),
    stop(EntityMarker, r"ЕАД", 30),
    stop(EntityMarker, r"АД", 31),
    stop(EntityMarker, r"ЕТ", 31),
    stop(EntityMarker, r"сдружение", 30),
    stop(EntityMarker, r"фондация", 30),
    stop(EntityMarker, r"кметство", 30),
    stop(EntityMarker, r"читалище", 30),
    stop(EntityMarker, r"училище", 30),
    stop(EntityMarker, r"детска градина", 30),
    stop(EntityMarker, r"ДГ", 31),
    stop(EntityMarker, r"СУ", 31),
    stop(EntityMarker, r"ОУ", 31),
    stop(EntityMarker, r"университет\p{L}*", 30),
    stop(EntityMarker, r"администрация", 30),
    stop(EntityMarker, r"министерство", 30),
    stop(EntityMarker, r"поща", 30),
    stop(EntityMarker, r"бизнес център", 30),
    stop(EntityMarker, r"търговски център", 30),
    stop(EntityMarker, r"мол", 31),
    // туризъм
    stop(Tourism, r"хотел\p{L}*", 40),
    stop(Tourism, r"комплекс", 40),
    stop(Tourism, r"к-с", 40),
    stop(Tourism, r"почивна станция", 40),
    stop(Tourism, r"вила", 40),
    stop(Tourism, r"къмпинг", 40),
    stop(Tourism, r"балнео\p{L}*", 40),
    // свързващи и пълнежни фрази
    stop(Connective, r"в сградата", 50),
    stop(Connective, r"в двора", 50),
    stop(Connective, r"сграда", 51),
    stop(Connective, r"срещу", 50),
    stop(Connective, r"до", 51),
    stop(Connective, r"зад", 51),
    stop(Connective, r"находящ\p{L}*", 50),
    stop(Connective, r"намиращ\p{L}*", 50),
    stop(Connective, r"непосредствено", 50),
    stop(Connective, r"бивш\p{L}*", 50),
    stop(Connective, r"на територията", 50),
    // кадастър
    stop(Cadastral, r"УПИ", 60),
    stop(Cadastral, r"ПИ", 61),
    stop(Cadastral, r"поземлен\p{L}*", 60),
    stop(Cadastral, r"имот", 60),
    stop(Cadastral, r"парцел", 60),
    stop(Cadastral, r"идентификатор", 60),
    stop(Cadastral, r"кад\.", 60),
    stop(Cadastral, r"кадастрал\p{L}*", 60),
];

/// Characters that may immediately precede a stop-word.
const DELIMITERS: &str = r",\s().\-/";

pub struct CompiledStopWord {
    pub rule: StopWord,
    pub regex: Regex,
}

pub static COMPILED_STOP_WORDS: LazyLock<Vec<CompiledStopWord>> =
    LazyLock::new(|| STOP_WORDS.iter().map(|rule| compile(*rule)).collect());

/// Builds `(?i)(?:^|[delims])(?:pattern)` plus a trailing word boundary when
/// the pattern ends in a word character.
pub fn compile(rule: StopWord) -> CompiledStopWord {
    let needs_boundary = rule
        .pattern
        .chars()
        .last()
        .map(char::is_alphanumeric)
        .unwrap_or(false);
    let boundary = if needs_boundary { r"\b" } else { "" };
    let source = format!(r"(?i)(?:^|[{}])(?:{}){}", DELIMITERS, rule.pattern, boundary);
    let regex = Regex::new(&source).expect("stop-word table entries are valid regex fragments");
    CompiledStopWord { rule, regex }
}

/// A stop-word hit: `start` is the byte offset of the delimiter (or 0 at the
/// start of the string), where the cut begins.
#[derive(Debug, Clone, Copy)]
pub struct StopWordMatch {
    pub start: usize,
    pub rule: StopWord,
}

/// Leftmost stop-word occurrence over the whole table.
pub fn find_leftmost(text: &str) -> Option<StopWordMatch> {
    COMPILED_STOP_WORDS
        .iter()
        .filter_map(|compiled| {
            compiled.regex.find(text).map(|m| StopWordMatch {
                start: m.start(),
                rule: compiled.rule,
            })
        })
        .min_by_key(|hit| (hit.start, hit.rule.priority))
}
