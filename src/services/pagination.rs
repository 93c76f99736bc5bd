//! 长文本分页
//!
//! 按段落 → 句子 → 空白 → 字符的优先级切分，每一页都是原文的连续片段，
//! 字符数不超过上限。

/// 详细分析每页的默认上限，低于聊天消息 4096 字符的硬限制
pub const DEFAULT_CHUNK_LIMIT: usize = 3800;

type Span = (usize, usize);

#[derive(Debug, Clone, Copy)]
enum Level {
    Sentence,
    Word,
    Char,
}

/// 将文本切分为不超过 `limit` 个字符的若干页
pub fn paginate(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut pieces = Vec::new();
    for span in paragraph_spans(text) {
        split_to_fit(text, span, limit, Level::Sentence, &mut pieces);
    }
    pack(text, &pieces, limit)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 以空行分段，去掉每段首尾空白，跳过空段
fn paragraph_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for part in text.split("\n\n") {
        let start = offset;
        offset += part.len() + 2;
        if let Some(span) = trim_span(text, (start, start + part.len())) {
            spans.push(span);
        }
    }
    spans
}

fn trim_span(text: &str, (start, end): Span) -> Option<Span> {
    let slice = &text[start..end];
    let trimmed_start = slice.trim_start();
    if trimmed_start.is_empty() {
        return None;
    }
    let s = start + (slice.len() - trimmed_start.len());
    let e = s + trimmed_start.trim_end().len();
    Some((s, e))
}

fn split_to_fit(text: &str, span: Span, limit: usize, level: Level, out: &mut Vec<Span>) {
    if char_len(&text[span.0..span.1]) <= limit {
        out.push(span);
        return;
    }
    match level {
        Level::Sentence => {
            for s in sentence_spans(text, span) {
                split_to_fit(text, s, limit, Level::Word, out);
            }
        }
        Level::Word => {
            for s in word_spans(text, span) {
                split_to_fit(text, s, limit, Level::Char, out);
            }
        }
        Level::Char => hard_split(text, span, limit, out),
    }
}

/// 句子以 `.`、`!`、`?` 后接空白结尾
fn sentence_spans(text: &str, (start, end): Span) -> Vec<Span> {
    let slice = &text[start..end];
    let mut spans = Vec::new();
    let mut sentence_start = 0;
    let mut chars = slice.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(_, next)) = chars.peek() else {
            continue;
        };
        if !next.is_whitespace() {
            continue;
        }
        spans.push((start + sentence_start, start + i + c.len_utf8()));
        sentence_start = slice.len();
        while let Some(&(k, w)) = chars.peek() {
            if !w.is_whitespace() {
                sentence_start = k;
                break;
            }
            chars.next();
        }
    }
    if sentence_start < slice.len() {
        spans.push((start + sentence_start, end));
    }
    spans
}

fn word_spans(text: &str, (start, end): Span) -> Vec<Span> {
    let slice = &text[start..end];
    let mut spans = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in slice.char_indices() {
        match (c.is_whitespace(), word_start) {
            (true, Some(ws)) => {
                spans.push((start + ws, start + i));
                word_start = None;
            }
            (false, None) => word_start = Some(i),
            _ => {}
        }
    }
    if let Some(ws) = word_start {
        spans.push((start + ws, end));
    }
    spans
}

fn hard_split(text: &str, (start, end): Span, limit: usize, out: &mut Vec<Span>) {
    let slice = &text[start..end];
    let mut piece_start = 0;
    let mut count = 0;
    for (i, _) in slice.char_indices() {
        if count == limit {
            out.push((start + piece_start, start + i));
            piece_start = i;
            count = 0;
        }
        count += 1;
    }
    if piece_start < slice.len() {
        out.push((start + piece_start, end));
    }
}

/// 贪心合并相邻片段，合并后的页仍是原文的连续片段
fn pack(text: &str, pieces: &[Span], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Option<Span> = None;

    for &(ps, pe) in pieces {
        current = match current {
            None => Some((ps, pe)),
            Some((cs, _)) if char_len(&text[cs..pe]) <= limit => Some((cs, pe)),
            Some((cs, ce)) => {
                chunks.push(text[cs..ce].to_string());
                Some((ps, pe))
            }
        };
    }
    if let Some((cs, ce)) = current {
        chunks.push(text[cs..ce].to_string());
    }
    chunks
}
