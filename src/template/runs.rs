//! Text Run Rewriting
//!
//! スライドXML（DrawingML）のテキストラン`<a:r>`内の`<a:t>`テキストだけを書き換え、
//! それ以外のイベントはそのまま書き出すストリーミング処理。

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::{Captures, Regex};

use crate::error::SlideMergeError;

/// プレースホルダートークン（`{A}`, `{AB}`など）
const TOKEN_PATTERN: &str = r"\{([A-Z]+)\}";

/// プレースホルダートークンのマッチャー
#[derive(Debug, Clone)]
pub(crate) struct TokenPattern {
    regex: Regex,
}

impl TokenPattern {
    pub fn new() -> Result<Self, SlideMergeError> {
        let regex = Regex::new(TOKEN_PATTERN)
            .map_err(|e| SlideMergeError::Config(format!("Invalid token pattern: {}", e)))?;
        Ok(Self { regex })
    }

    /// テキスト中のトークンを1パスで置換する
    ///
    /// 対応する値のない列記号のトークンはそのまま残します。
    /// 置換後の値は再走査されません。
    pub fn substitute<'t>(&self, text: &'t str, values: &HashMap<String, String>) -> Cow<'t, str> {
        self.regex.replace_all(text, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
    }

    /// 置換によってテキストが変化した場合のみ新しいテキストを返す
    pub fn replace_in(&self, text: &str, values: &HashMap<String, String>) -> Option<String> {
        match self.substitute(text, values) {
            Cow::Owned(replaced) if replaced != text => Some(replaced),
            _ => None,
        }
    }

    /// テキスト中のトークン（`{A}`形式）を出現順に列挙
    pub fn tokens<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.regex.find_iter(text).map(|m| m.as_str()).collect()
    }
}

/// テキストラン内のテキストを書き換える
///
/// `rewrite`が`Some`を返した場合のみテキストを置き換え、再エスケープして書き出します。
/// `None`の場合は元のバイト列をそのまま書き出します。
/// フィールド（`<a:fld>`）内のテキストは対象外です。
pub(crate) fn rewrite_runs<F>(xml: &[u8], part: &str, mut rewrite: F) -> Result<Vec<u8>, SlideMergeError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    let mut buf = Vec::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| template_error(part, e))?;

        match &event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" if in_run => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }

        let replaced = match &event {
            Event::Text(text) if in_text => {
                let raw = text.unescape().map_err(|e| template_error(part, e))?;
                rewrite(&raw)
            }
            _ => None,
        };

        let result = match replaced {
            Some(new_text) => writer.write_event(Event::Text(BytesText::new(&new_text))),
            None => writer.write_event(event),
        };
        result.map_err(|e| template_error(part, e))?;

        buf.clear();
    }

    Ok(writer.into_inner())
}

fn template_error(part: &str, e: quick_xml::Error) -> SlideMergeError {
    SlideMergeError::Template {
        part: part.to_string(),
        message: e.to_string(),
    }
}
