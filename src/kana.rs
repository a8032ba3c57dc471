//! Romaji → katakana
//!
//! Wapuro-Hepburn romaji in, katakana out, in four table passes:
//!
//! ```text
//! upper-case ─▶ PRE (small vowels, doubled consonants → ッ)
//!            ─▶ ROMAJI (syllables)
//!            ─▶ hiragana → katakana
//!            ─▶ POST (dangling X → ッ, dashes → ー, drop ')
//!            ─▶ keep Japanese characters only
//! ```
//!
//! Each pass scans left to right; at every position the first table entry
//! that matches wins, and unmatched characters pass through.

const PRE: &[(&str, &str)] = &[
    ("XA", "ァ"),
    ("XI", "ィ"),
    ("XU", "ゥ"),
    ("XE", "ェ"),
    ("XO", "ォ"),
    ("BB", "ッB"),
    ("TC", "ッC"),
    ("CC", "ッC"),
    ("DD", "ッD"),
    ("FF", "ッF"),
    ("GG", "ッG"),
    ("HH", "ッH"),
    ("JJ", "ッJ"),
    ("KK", "ッK"),
    ("LL", "ッL"),
    ("MM", "ッM"),
    ("PP", "ッP"),
    ("QQ", "ッQ"),
    ("RR", "ッR"),
    ("SS", "ッS"),
    ("TT", "ッT"),
    ("VV", "ッV"),
    ("WW", "ッW"),
    ("YY", "ッY"),
    ("ZZ", "ッZ"),
];

const ROMAJI: &[(&str, &str)] = &[
    ("KA", "カ"),
    ("KI", "キ"),
    ("KU", "ク"),
    ("KE", "ケ"),
    ("KO", "コ"),
    ("SA", "サ"),
    ("SHI", "シ"),
    ("SU", "ス"),
    ("SE", "セ"),
    ("SO", "ソ"),
    ("TA", "タ"),
    ("CHI", "チ"),
    ("TSU", "ツ"),
    ("TE", "テ"),
    ("TO", "ト"),
    ("NA", "ナ"),
    ("NI", "ニ"),
    ("NU", "ヌ"),
    ("NE", "ネ"),
    ("NO", "ノ"),
    ("HA", "ハ"),
    ("HI", "ヒ"),
    ("FU", "フ"),
    ("HE", "ヘ"),
    ("HO", "ホ"),
    ("MA", "マ"),
    ("MI", "ミ"),
    ("MU", "ム"),
    ("ME", "メ"),
    ("MO", "モ"),
    ("YA", "ヤ"),
    ("YU", "ユ"),
    ("YO", "ヨ"),
    ("RA", "ラ"),
    ("RI", "リ"),
    ("RU", "ル"),
    ("RE", "レ"),
    ("RO", "ロ"),
    ("WA", "ワ"),
    ("WO", "ヲ"),
    ("GA", "ガ"),
    ("GI", "ギ"),
    ("GU", "グ"),
    ("GE", "ゲ"),
    ("GO", "ゴ"),
    ("ZA", "ザ"),
    ("JI", "ジ"),
    ("ZU", "ズ"),
    ("ZE", "ゼ"),
    ("ZO", "ゾ"),
    ("DA", "ダ"),
    ("DI", "ヂ"),
    ("DU", "ヅ"),
    ("DE", "デ"),
    ("DO", "ド"),
    ("BA", "バ"),
    ("BI", "ビ"),
    ("BU", "ブ"),
    ("BE", "ベ"),
    ("BO", "ボ"),
    ("PA", "パ"),
    ("PI", "ピ"),
    ("PU", "プ"),
    ("PE", "ペ"),
    ("PO", "ポ"),
    ("KYA", "キャ"),
    ("KYU", "キュ"),
    ("KYO", "キョ"),
    ("SHA", "シャ"),
    ("SHU", "シュ"),
    ("SHO", "ショ"),
    ("CHA", "チャ"),
    ("CHU", "チュ"),
    ("CHO", "チョ"),
    ("NYA", "ニャ"),
    ("NYU", "ニュ"),
    ("NYO", "ニョ"),
    ("HYA", "ヒャ"),
    ("HYU", "ヒュ"),
    ("HYO", "ヒョ"),
    ("MYA", "ミャ"),
    ("MYU", "ミュ"),
    ("MYO", "ミョ"),
    ("RYA", "リャ"),
    ("RYU", "リュ"),
    ("RYO", "リョ"),
    ("GYA", "ギャ"),
    ("GYU", "ギュ"),
    ("GYO", "ギョ"),
    ("JA", "ジャ"),
    ("JU", "ジュ"),
    ("JO", "ジョ"),
    ("JYA", "ジャ"),
    ("JYU", "ジュ"),
    ("JYO", "ジョ"),
    ("DYA", "ヂャ"),
    ("DYU", "ヂュ"),
    ("DYO", "ヂョ"),
    ("BYA", "ビャ"),
    ("BYU", "ビュ"),
    ("BYO", "ビョ"),
    ("PYA", "ピャ"),
    ("PYU", "ピュ"),
    ("PYO", "ピョ"),
    ("YI", "イィ"),
    ("YE", "イェ"),
    ("WI", "ウィ"),
    ("WU", "ウゥ"),
    ("WE", "ウェ"),
    ("WYU", "ウュ"),
    ("VA", "ヴァ"),
    ("VI", "ヴィ"),
    ("VU", "ヴ"),
    ("VE", "ヴェ"),
    ("VO", "ヴォ"),
    ("VYA", "ヴャ"),
    ("VYU", "ヴュ"),
    ("VYE", "ヴィェ"),
    ("VYO", "ヴョ"),
    ("KYE", "キェ"),
    ("GYE", "ギェ"),
    ("KWA", "クァ"),
    ("KWI", "クィ"),
    ("KWE", "クェ"),
    ("KWU", "クゥ"),
    ("KWO", "クォ"),
    ("GWA", "グァ"),
    ("GWI", "グィ"),
    ("GWE", "グェ"),
    ("GWO", "グォ"),
    ("GWU", "グゥ"),
    ("SHE", "シェ"),
    ("JE", "ジェ"),
    ("SI", "スィ"),
    ("ZI", "ズィ"),
    ("CHE", "チェ"),
    ("TSA", "ツァ"),
    ("TSE", "ツェ"),
    ("TSI", "ツィ"),
    ("TSO", "ツォ"),
    ("TSYU", "ツュ"),
    ("TI", "ティ"),
    ("TU", "トゥ"),
    ("TYU", "テュ"),
    ("NYE", "ニェ"),
    ("HYE", "ヒェ"),
    ("BYE", "ビェ"),
    ("PYE", "ピェ"),
    ("FA", "ファ"),
    ("FI", "フィ"),
    ("FE", "フェ"),
    ("FO", "フォ"),
    ("FYA", "フャ"),
    ("FYU", "フュ"),
    ("FYE", "フィェ"),
    ("FYO", "フョ"),
    ("HU", "ホゥ"),
    ("MYE", "ミェ"),
    ("RYE", "リェ"),
    ("LA", "ラ"),
    ("LI", "リ"),
    ("LU", "ル"),
    ("LE", "レ"),
    ("LO", "ロ"),
    ("QA", "クァ"),
    ("QI", "クィ"),
    ("QE", "クェ"),
    ("QO", "クォ"),
    ("QU", "クヮ"),
    ("A", "ア"),
    ("I", "イ"),
    ("U", "ウ"),
    ("E", "エ"),
    ("O", "オ"),
    ("N", "ン"),
];

const POST: &[(&str, &str)] = &[("X", "ッ"), ("–", "ー"), ("-", "ー"), ("'", "")];

/// Convert romaji to katakana, dropping anything that is not Japanese
pub fn to_katakana(input: &str) -> String {
    let upper = input.to_uppercase();
    let pre = replace(&upper, PRE);
    let kana = replace(&pre, ROMAJI);
    let katakana: String = kana.chars().map(hiragana_to_katakana).collect();
    replace(&katakana, POST)
        .chars()
        .filter(|&c| is_japanese(c))
        .collect()
}

fn replace(input: &str, table: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(input.len() * 2);
    let mut rest = input;
    'scan: while let Some(c) = rest.chars().next() {
        for (from, to) in table {
            if let Some(tail) = rest.strip_prefix(from) {
                out.push_str(to);
                rest = tail;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn hiragana_to_katakana(c: char) -> char {
    match c {
        'ぁ'..='ゖ' | 'ゝ'..='ゞ' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
        _ => c,
    }
}

/// Hiragana, katakana (with the prolonged sound mark) and CJK ideographs
fn is_japanese(c: char) -> bool {
    matches!(c,
        '\u{3041}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{31F0}'..='\u{31FF}'
        | '\u{FF66}'..='\u{FF9D}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}')
}
