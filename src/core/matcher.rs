//! 路径匹配器
//!
//! 把一条过滤规则的路径根翻译成遍历计划:字面路径直接递归列出;
//! glob 模式先切出无通配符的前缀作为列表根,推导出列表深度,
//! 再在客户端用编译好的正则过滤。产出一律是惰性流。

use anyhow::Result;
use futures::StreamExt;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::PlanError;
use crate::storage::{FileInfoStream, Storage, LIST_CHANNEL_CAPACITY};

/// 路径是否含通配符
pub fn has_magic(path: &str) -> bool {
    path.contains('*') || path.contains('?') || path.contains('[')
}

/// 校验 glob 模式:`**` 必须独占一个路径段
pub fn validate_pattern(pattern: &str) -> Result<(), PlanError> {
    for segment in pattern.split('/') {
        if segment.contains("**") && segment != "**" {
            return Err(PlanError::Pattern {
                pattern: pattern.to_string(),
                reason: "`**` 必须独占一个路径段".to_string(),
            });
        }
    }
    Ok(())
}

/// 一个路径根的遍历计划
#[derive(Debug)]
pub enum TraversalPlan {
    /// 字面路径,目录递归展开,文件直接产出
    Literal { root: String },
    /// glob 模式
    Glob(GlobPlan),
    /// 含空字符类等永不匹配的模式
    Empty,
}

#[derive(Debug)]
pub struct GlobPlan {
    /// 无通配符前缀解析出的列表根
    pub root: String,
    /// 对完整相对路径做全匹配的正则
    pub regex: Regex,
    /// 列表深度;None 为无界
    pub list_depth: Option<u32>,
    /// 匹配到目录时是否继续向下展开
    pub expand_dirs: bool,
}

/// 字面路径计划
pub fn plan_literal(root: impl Into<String>) -> TraversalPlan {
    TraversalPlan::Literal {
        root: root.into().trim_matches('/').to_string(),
    }
}

/// 把 glob 模式编译成遍历计划
///
/// 不含通配符的模式退化为字面路径。深度推导:无 `**` 时取模式段数;
/// 有 `**` 且配置了 max_depth 时为「`**` 之前的段数 + max_depth」,
/// 否则无界。
pub fn plan_pattern(pattern: &str, max_depth: Option<u32>) -> Result<TraversalPlan, PlanError> {
    let pattern = pattern.trim_matches('/');
    validate_pattern(pattern)?;

    if !has_magic(pattern) {
        return Ok(plan_literal(pattern));
    }

    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let first_magic = segments
        .iter()
        .position(|s| has_magic(s))
        .unwrap_or(segments.len());
    let root = segments[..first_magic].join("/");
    let remainder = &segments[first_magic..];

    let double_star = remainder.iter().position(|s| *s == "**");
    let list_depth = match double_star {
        Some(i) => max_depth.map(|md| i as u32 + md),
        None => Some(remainder.len() as u32),
    };

    let translated = match translate_segments(remainder, pattern)? {
        Some(t) => t,
        // 空字符类不匹配任何路径
        None => return Ok(TraversalPlan::Empty),
    };
    let prefix = if root.is_empty() {
        String::new()
    } else {
        format!("{}/", regex::escape(&root))
    };
    let regex = Regex::new(&format!("^{}{}$", prefix, translated)).map_err(|e| {
        PlanError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(TraversalPlan::Glob(GlobPlan {
        root,
        regex,
        list_depth,
        expand_dirs: remainder.last() != Some(&"**"),
    }))
}

/// 模式段序列 → 正则;出现 `[]` 时返回 None(永不匹配)
fn translate_segments(segments: &[&str], pattern: &str) -> Result<Option<String>, PlanError> {
    let mut out = String::new();
    for (idx, segment) in segments.iter().enumerate() {
        let last = idx == segments.len() - 1;
        if *segment == "**" {
            // `**` 跨任意多个段,包括零个
            out.push_str(if last { ".*" } else { "(?:.*/)?" });
            continue;
        }
        match translate_segment(segment).map_err(|reason| PlanError::Pattern {
            pattern: pattern.to_string(),
            reason,
        })? {
            Some(t) => out.push_str(&t),
            None => return Ok(None),
        }
        if !last {
            out.push('/');
        }
    }
    Ok(Some(out))
}

/// 单段 glob → 正则片段
fn translate_segment(segment: &str) -> Result<Option<String>, String> {
    let mut out = String::new();
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                for c2 in chars.by_ref() {
                    if c2 == ']' {
                        closed = true;
                        break;
                    }
                    class.push(c2);
                }
                if !closed {
                    return Err(format!("段 '{}' 的字符类缺少 ']'", segment));
                }
                match class.as_str() {
                    // 空类不匹配任何内容,整个模式作废
                    "" => return Ok(None),
                    // 否定空类匹配段内任意单个字符
                    "!" => out.push_str("[^/]"),
                    _ => {
                        let (negated, body) = match class.strip_prefix('!') {
                            Some(rest) => (true, rest),
                            None => (false, class.as_str()),
                        };
                        out.push('[');
                        if negated {
                            out.push('^');
                        }
                        out.push_str(&escape_class_body(body, negated));
                        out.push(']');
                    }
                }
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    Ok(Some(out))
}

/// 转义字符类内容,保留 `-` 使区间可用
fn escape_class_body(body: &str, negated: bool) -> String {
    let mut out = String::new();
    for (i, c) in body.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '[' => out.push_str("\\["),
            '&' => out.push_str("\\&"),
            '~' => out.push_str("\\~"),
            // 首位的 ^ 会被误认作否定
            '^' if i == 0 && !negated => out.push_str("\\^"),
            _ => out.push(c),
        }
    }
    out
}

/// 展开一个遍历计划为惰性文件流(不含目录)
pub async fn expand_plan(
    storage: Arc<dyn Storage>,
    plan: TraversalPlan,
    recursive: bool,
    max_depth: Option<u32>,
) -> Result<FileInfoStream> {
    match plan {
        TraversalPlan::Empty => Ok(Box::pin(futures::stream::empty())),
        TraversalPlan::Literal { root } => {
            let stream = storage.list(&root, recursive, max_depth).await?;
            Ok(Box::pin(stream.filter(|item| {
                let keep = match item {
                    Ok(info) => !info.is_dir,
                    Err(_) => true,
                };
                async move { keep }
            })))
        }
        TraversalPlan::Glob(glob) => expand_glob(storage, glob, recursive, max_depth).await,
    }
}

async fn expand_glob(
    storage: Arc<dyn Storage>,
    glob: GlobPlan,
    recursive: bool,
    max_depth: Option<u32>,
) -> Result<FileInfoStream> {
    let mut stream = storage.list(&glob.root, true, glob.list_depth).await?;
    let (tx, rx) = mpsc::channel(LIST_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            let info = match item {
                Ok(info) => info,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            if !glob.regex.is_match(&info.path) {
                continue;
            }
            if info.is_dir {
                // 目录命中后按剩余深度预算继续向下
                let budget_left = max_depth.map_or(true, |d| d > 1);
                if !(glob.expand_dirs && recursive && budget_left) {
                    continue;
                }
                let sub_depth = max_depth.map(|d| d - 1);
                let mut sub = match storage.list(&info.path, true, sub_depth).await {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                while let Some(sub_item) = sub.next().await {
                    match sub_item {
                        Ok(s) if s.is_dir => continue,
                        other => {
                            if tx.send(other).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            } else if tx.send(Ok(info)).await.is_err() {
                return;
            }
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}
