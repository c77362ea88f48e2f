use serde::{Deserialize, Serialize};

/// 单个待回答的问题
///
/// `index` 是问题在批次中的位置，答案必须按同一位置返回。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub index: usize,
    pub text: String,
}

impl Question {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// 将有序的问题文本列表转换为带索引的问题
    pub fn from_texts<I, S>(texts: I) -> Vec<Question>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Question::new(index, text))
            .collect()
    }
}

/// 单个问题的最终答案（成功文本或错误标记）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub index: usize,
    pub text: String,
    pub is_error: bool,
}

impl Answer {
    pub fn success(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            is_error: true,
        }
    }
}

/// 批量问答请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// 文档引用（URL 等），对调度器不透明
    pub documents: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// 批量问答响应，`answers[i]` 对应 `questions[i]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    pub answers: Vec<String>,
}

impl From<Vec<Answer>> for BatchResponse {
    fn from(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into_iter().map(|a| a.text).collect(),
        }
    }
}
