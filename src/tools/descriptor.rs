//! 工具描述：名称、领域标签、参数 schema、输出类型
//!
//! ParamSchema 既用于生成供路由器（LLM）阅读的 JSON Schema，也用于调用前的参数校验：
//! 必填参数缺失或类型不符时在任何副作用之前拒绝请求。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ChartError;

/// 领域标签（如统计、3D、流程图），供路由器与运维理解工具用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTag {
    Flowchart,
    Uml,
    Graph,
    Statistical,
    Scientific,
    Financial,
    TimeSeries,
    Geographic,
    Network,
    Molecular,
    #[serde(rename = "3d")]
    ThreeD,
    Custom,
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DomainTag::Flowchart => "flowchart",
            DomainTag::Uml => "uml",
            DomainTag::Graph => "graph",
            DomainTag::Statistical => "statistical",
            DomainTag::Scientific => "scientific",
            DomainTag::Financial => "financial",
            DomainTag::TimeSeries => "time_series",
            DomainTag::Geographic => "geographic",
            DomainTag::Network => "network",
            DomainTag::Molecular => "molecular",
            DomainTag::ThreeD => "3d",
            DomainTag::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// 输出类型：静态图片 / 交互式文档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    StaticImage,
    InteractiveDocument,
}

/// 参数类型（对应 JSON Schema 的 type）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// 值是否符合该类型；Integer 只接受整数，Number 接受任意数字
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// 单个参数的声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// 枚举约束（如输出格式）；为空表示不限
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub allowed: Vec<Value>,
}

impl ParamSpec {
    pub fn required(name: &str, ty: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
            description: description.to_string(),
            default: None,
            allowed: Vec::new(),
        }
    }

    pub fn optional(name: &str, ty: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty, description)
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// 在枚举中查找取值；字符串忽略大小写，返回枚举中的规范写法
    fn match_allowed(&self, value: &Value) -> Option<Value> {
        self.allowed
            .iter()
            .find(|a| match (*a, value) {
                (Value::String(a), Value::String(v)) => a.eq_ignore_ascii_case(v),
                (a, v) => a == v,
            })
            .cloned()
    }
}

/// 参数 schema：按声明顺序保存参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSchema {
    params: Vec<ParamSpec>,
}

/// 校验通过（已填默认值）的参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParams {
    values: BTreeMap<String, Value>,
}

impl ValidatedParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        self.values.get(name).and_then(Value::as_u64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加参数；同名参数后者覆盖前者
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.retain(|p| p.name != spec.name);
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// 转为 JSON Schema（object），供路由器生成参数
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(p.ty.as_str().into()));
            prop.insert("description".into(), Value::String(p.description.clone()));
            if let Some(d) = &p.default {
                prop.insert("default".into(), d.clone());
            }
            if !p.allowed.is_empty() {
                prop.insert("enum".into(), Value::Array(p.allowed.clone()));
            }
            properties.insert(p.name.clone(), Value::Object(prop));
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required_names(),
        })
    }

    /// 校验参数：先检查所有必填参数是否存在（一次列出全部缺失项），再逐个检查类型与枚举；
    /// 缺省的可选参数填入默认值，未声明的多余参数忽略
    pub fn validate(&self, args: &Value) -> Result<ValidatedParams, ChartError> {
        let empty = Map::new();
        let obj = match args {
            Value::Object(m) => m,
            Value::Null => &empty,
            other => {
                return Err(ChartError::BadRequest(format!(
                    "parameters must be a JSON object, got {}",
                    json_type_name(other)
                )))
            }
        };

        let missing: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required && obj.get(&p.name).map_or(true, Value::is_null))
            .map(|p| p.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ChartError::BadRequest(format!(
                "missing required parameter(s): {}",
                missing.join(", ")
            )));
        }

        let mut out = ValidatedParams::default();
        for p in &self.params {
            match obj.get(&p.name).filter(|v| !v.is_null()) {
                Some(v) => {
                    if !p.ty.accepts(v) {
                        return Err(ChartError::BadRequest(format!(
                            "parameter '{}' must be of type {}, got {}",
                            p.name,
                            p.ty.as_str(),
                            json_type_name(v)
                        )));
                    }
                    let value = if p.allowed.is_empty() {
                        v.clone()
                    } else {
                        p.match_allowed(v).ok_or_else(|| {
                            ChartError::BadRequest(format!(
                                "parameter '{}' must be one of {}, got {}",
                                p.name,
                                Value::Array(p.allowed.clone()),
                                v
                            ))
                        })?
                    };
                    out.insert(&p.name, value);
                }
                None => {
                    if let Some(d) = &p.default {
                        out.insert(&p.name, d.clone());
                    }
                }
            }
        }

        for key in obj.keys().filter(|k| self.get(k).is_none()) {
            tracing::debug!(param = %key, "ignoring undeclared parameter");
        }
        Ok(out)
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 渲染工具描述：唯一名称、领域、参数、输出类型与支持的格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub domain: DomainTag,
    pub params: ParamSchema,
    pub output_kind: OutputKind,
    pub formats: Vec<String>,
    pub default_format: String,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, domain: DomainTag, output_kind: OutputKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            domain,
            params: ParamSchema::new(),
            output_kind,
            formats: Vec::new(),
            default_format: String::new(),
        }
    }

    /// 设置支持的格式（第一个为默认格式）
    pub fn formats(mut self, formats: &[&str]) -> Self {
        self.formats = formats.iter().map(|s| s.to_string()).collect();
        self.default_format = self.formats.first().cloned().unwrap_or_default();
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params = self.params.param(spec);
        self
    }

    pub fn supports_format(&self, format: &str) -> bool {
        self.formats.iter().any(|f| f.eq_ignore_ascii_case(format))
    }

    /// 通用渲染参数：code（必填）、output_format、title、width、height
    pub fn with_chart_params(self, code_description: &str, default_title: &str) -> Self {
        let formats = self.formats.clone();
        let default_format = self.default_format.clone();
        self.param(ParamSpec::required("code", ParamType::String, code_description))
            .param(
                ParamSpec::optional("output_format", ParamType::String, "Output file format")
                    .with_allowed(formats)
                    .with_default(default_format),
            )
            .param(
                ParamSpec::optional("title", ParamType::String, "Artifact file name (without extension)")
                    .with_default(default_title),
            )
            .param(ParamSpec::optional("width", ParamType::Integer, "Width in pixels").with_default(800))
            .param(ParamSpec::optional("height", ParamType::Integer, "Height in pixels").with_default(600))
    }
}
