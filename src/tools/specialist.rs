//! 专家分组：协调者把请求交给某个专家时，只向路由器暴露该专家负责的工具

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 专家（按图表领域划分的工具分组）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialist {
    /// 流程图、时序图、UML、架构图
    FlowArchitect,
    /// 统计、科学、金融、地理等数据图表
    DataViz,
    /// 思维导图、概念图、分子结构
    ConceptualMind,
    /// 交互式与 3D 可视化
    InteractiveDynamic,
    /// 技术文档配图
    DocumentChart,
}

impl Specialist {
    pub const ALL: [Specialist; 5] = [
        Specialist::FlowArchitect,
        Specialist::DataViz,
        Specialist::ConceptualMind,
        Specialist::InteractiveDynamic,
        Specialist::DocumentChart,
    ];

    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            Specialist::FlowArchitect => &[
                "mermaid_render",
                "plantuml_render",
                "graphviz_render",
                "flowchartjs_render",
                "pyvis_render",
            ],
            Specialist::DataViz => &[
                "matplotlib_render",
                "plotly_render",
                "seaborn_render",
                "echarts_render",
                "mplfinance_render",
                "dygraphs_render",
                "folium_render",
                "d3_render",
            ],
            Specialist::ConceptualMind => &[
                "graphviz_render",
                "mermaid_render",
                "plotly_render",
                "py3dmol_render",
            ],
            Specialist::InteractiveDynamic => &[
                "plotly_render",
                "echarts_render",
                "threejs_render",
                "dygraphs_render",
            ],
            Specialist::DocumentChart => &["mermaid_render", "matplotlib_render", "plantuml_render"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Specialist::FlowArchitect => "flow_architect",
            Specialist::DataViz => "data_viz",
            Specialist::ConceptualMind => "conceptual_mind",
            Specialist::InteractiveDynamic => "interactive_dynamic",
            Specialist::DocumentChart => "document_chart",
        }
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialist {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specialist::ALL
            .iter()
            .copied()
            .find(|sp| sp.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown specialist: {}", s))
    }
}
