//! 内置渲染工具目录
//!
//! 15 个工具，分三类后端：
//! - 命令行：mermaid（mmdc）、graphviz（dot）、plantuml
//! - Python 脚本：matplotlib、seaborn、plotly、mplfinance、folium、pyvis、py3Dmol
//! - HTML 模板：d3、echarts、three.js、dygraphs、flowchart.js
//!
//! 每个工具声明自己的运行时依赖，由 ToolRegistry::activate_all 探测后决定是否启用。

use crate::tools::backend::{CommandBackend, RenderBackend, SourceTransform};
use crate::tools::descriptor::{DomainTag, OutputKind, ParamSpec, ParamType, ToolDescriptor};
use crate::tools::html::{CodeEmbedding, HtmlBackend};
use crate::tools::probe::Requirement;
use crate::tools::registry::{RegisteredTool, ToolRegistry};

pub const BUILTIN_TOOL_NAMES: [&str; 15] = [
    "mermaid_render",
    "graphviz_render",
    "plantuml_render",
    "matplotlib_render",
    "seaborn_render",
    "plotly_render",
    "mplfinance_render",
    "folium_render",
    "pyvis_render",
    "py3dmol_render",
    "d3_render",
    "echarts_render",
    "threejs_render",
    "dygraphs_render",
    "flowchartjs_render",
];

const D3_CDN: &str = "https://cdn.jsdelivr.net/npm/d3@7/dist/d3.min.js";
const ECHARTS_CDN: &str = "https://cdn.jsdelivr.net/npm/echarts@5.6.0/dist/echarts.min.js";
const THREE_CDN: &str = "https://unpkg.com/three@0.165.0/build/three.module.js";
const DYGRAPHS_CDN: &str = "https://cdn.jsdelivr.net/npm/dygraphs@2.2.1/dist/dygraph.min.js";
const RAPHAEL_CDN: &str = "https://cdn.jsdelivr.net/npm/raphael@2.3.0/raphael.min.js";
const FLOWCHART_CDN: &str = "https://cdn.jsdelivr.net/npm/flowchart.js@1.17.1/release/flowchart.min.js";

/// 目录选项
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Python 解释器
    pub python: String,
    pub default_width: u64,
    pub default_height: u64,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            default_width: 800,
            default_height: 600,
        }
    }
}

/// 一个候选工具：已注册形态 + 依赖声明
pub struct CatalogEntry {
    pub tool: RegisteredTool,
    pub requirements: Vec<Requirement>,
}

impl CatalogEntry {
    fn new(descriptor: ToolDescriptor, backend: RenderBackend, requirements: Vec<Requirement>) -> Self {
        Self {
            tool: RegisteredTool::new(descriptor, backend),
            requirements,
        }
    }
}

/// 把全部内置工具注册进 registry
pub fn register_builtin(registry: &mut ToolRegistry, options: &CatalogOptions) {
    for entry in builtin_tools(options) {
        registry.register(entry.tool, entry.requirements);
    }
}

pub fn builtin_tools(options: &CatalogOptions) -> Vec<CatalogEntry> {
    let mut entries = vec![mermaid(), graphviz(), plantuml()];
    entries.extend(python_tools(&options.python));
    entries.extend(html_tools());
    for entry in &mut entries {
        apply_size_defaults(&mut entry.tool.descriptor, options);
    }
    entries
}

fn apply_size_defaults(d: &mut ToolDescriptor, options: &CatalogOptions) {
    let width = ParamSpec::optional("width", ParamType::Integer, "Width in pixels")
        .with_default(options.default_width);
    let height = ParamSpec::optional("height", ParamType::Integer, "Height in pixels")
        .with_default(options.default_height);
    d.params = std::mem::take(&mut d.params).param(width).param(height);
}

fn mermaid() -> CatalogEntry {
    let d = ToolDescriptor::new(
        "mermaid_render",
        "Render Mermaid diagrams (flowchart, sequence, class, state, journey, gantt) to an image.",
        DomainTag::Flowchart,
        OutputKind::StaticImage,
    )
    .formats(&["png", "svg", "pdf"])
    .with_chart_params("Mermaid diagram source, e.g. 'graph TD; A-->B'", "mermaid_diagram");
    let backend = CommandBackend::new(
        "mmdc",
        &["-i", "{{input}}", "-o", "{{output}}", "-w", "{{width}}", "-H", "{{height}}"],
        "diagram.mmd",
        "output.{{format}}",
    );
    CatalogEntry::new(
        d,
        RenderBackend::Command(backend),
        vec![Requirement::executable("mmdc")],
    )
}

fn graphviz() -> CatalogEntry {
    let d = ToolDescriptor::new(
        "graphviz_render",
        "Render Graphviz DOT graphs (directed, undirected, clusters) with a choice of layout engine.",
        DomainTag::Graph,
        OutputKind::StaticImage,
    )
    .formats(&["png", "svg", "pdf", "dot", "ps"])
    .with_chart_params("DOT source, e.g. 'digraph G { A -> B }'", "graphviz_graph")
    .param(
        ParamSpec::optional("layout_engine", ParamType::String, "Layout engine")
            .with_allowed(["dot", "neato", "fdp", "sfdp", "twopi", "circo"])
            .with_default("dot"),
    )
    .param(
        ParamSpec::optional("rankdir", ParamType::String, "Graph direction (dot layout only)")
            .with_allowed(["TB", "BT", "LR", "RL"])
            .with_default("TB"),
    )
    .param(ParamSpec::optional("dpi", ParamType::Integer, "Image resolution").with_default(96));
    let backend = CommandBackend::new(
        "dot",
        &[
            "-K{{layout_engine}}",
            "-Grankdir={{rankdir}}",
            "-Gdpi={{dpi}}",
            "-T{{format}}",
            "-o{{output}}",
            "{{input}}",
        ],
        "input.dot",
        "output.{{format}}",
    )
    .with_transform(SourceTransform::Dot);
    CatalogEntry::new(
        d,
        RenderBackend::Command(backend),
        vec![Requirement::executable_with_version("dot", &["-V"])],
    )
}

fn plantuml() -> CatalogEntry {
    let d = ToolDescriptor::new(
        "plantuml_render",
        "Render PlantUML diagrams (class, sequence, use case, activity, component, deployment).",
        DomainTag::Uml,
        OutputKind::StaticImage,
    )
    .formats(&["png", "svg"])
    .with_chart_params("PlantUML source; @startuml/@enduml are added when missing", "plantuml_diagram");
    let backend = CommandBackend::new(
        "plantuml",
        &["-t{{format}}", "-o", "{{dir}}", "{{input}}"],
        "diagram.puml",
        "diagram.{{format}}",
    )
    .with_transform(SourceTransform::PlantUml);
    CatalogEntry::new(
        d,
        RenderBackend::Command(backend),
        vec![Requirement::executable_with_version("plantuml", &["-version"])],
    )
}

const SAVE_PYPLOT: &str = "import matplotlib.pyplot as _plt\n_plt.gcf().set_size_inches(WIDTH / 100, HEIGHT / 100)\n_plt.savefig(OUTPUT_PATH, format=OUTPUT_FORMAT, dpi=100, bbox_inches='tight')";

struct PythonTool {
    name: &'static str,
    description: &'static str,
    domain: DomainTag,
    kind: OutputKind,
    formats: &'static [&'static str],
    code_hint: &'static str,
    title: &'static str,
    modules: &'static [&'static str],
    epilogue: &'static str,
}

fn python_tools(python: &str) -> Vec<CatalogEntry> {
    let specs = [
        PythonTool {
            name: "matplotlib_render",
            description: "Run matplotlib code and save the current figure (scientific and technical charts).",
            domain: DomainTag::Scientific,
            kind: OutputKind::StaticImage,
            formats: &["png", "svg", "pdf"],
            code_hint: "Python code drawing with matplotlib.pyplot; the current figure is saved",
            title: "matplotlib_chart",
            modules: &["matplotlib"],
            epilogue: SAVE_PYPLOT,
        },
        PythonTool {
            name: "seaborn_render",
            description: "Run seaborn code and save the current figure (statistical charts).",
            domain: DomainTag::Statistical,
            kind: OutputKind::StaticImage,
            formats: &["png", "svg", "pdf"],
            code_hint: "Python code using seaborn (imported as sns); the current figure is saved",
            title: "seaborn_chart",
            modules: &["seaborn", "matplotlib"],
            epilogue: SAVE_PYPLOT,
        },
        PythonTool {
            name: "plotly_render",
            description: "Run plotly code that builds a figure named `fig` and save it as an interactive page.",
            domain: DomainTag::Statistical,
            kind: OutputKind::InteractiveDocument,
            formats: &["html"],
            code_hint: "Python code building a plotly figure assigned to `fig`",
            title: "plotly_chart",
            modules: &["plotly"],
            epilogue: "fig.write_html(OUTPUT_PATH, include_plotlyjs='cdn')",
        },
        PythonTool {
            name: "mplfinance_render",
            description: "Run mplfinance code (candlestick, OHLC, volume) and save the current figure.",
            domain: DomainTag::Financial,
            kind: OutputKind::StaticImage,
            formats: &["png", "svg", "pdf"],
            code_hint: "Python code calling mplfinance (imported as mpf) on a pandas DataFrame",
            title: "finance_chart",
            modules: &["mplfinance"],
            epilogue: SAVE_PYPLOT,
        },
        PythonTool {
            name: "folium_render",
            description: "Run folium code that builds a map named `m` and save it as an interactive page.",
            domain: DomainTag::Geographic,
            kind: OutputKind::InteractiveDocument,
            formats: &["html"],
            code_hint: "Python code building a folium.Map assigned to `m`",
            title: "folium_map",
            modules: &["folium"],
            epilogue: "m.save(OUTPUT_PATH)",
        },
        PythonTool {
            name: "pyvis_render",
            description: "Run pyvis code that builds a network named `net` and save it as an interactive page.",
            domain: DomainTag::Network,
            kind: OutputKind::InteractiveDocument,
            formats: &["html"],
            code_hint: "Python code building a pyvis.network.Network assigned to `net`",
            title: "network_graph",
            modules: &["pyvis"],
            epilogue: "net.save_graph(OUTPUT_PATH)",
        },
        PythonTool {
            name: "py3dmol_render",
            description: "Run py3Dmol code that builds a viewer named `view` and save it as an interactive page.",
            domain: DomainTag::Molecular,
            kind: OutputKind::InteractiveDocument,
            formats: &["html"],
            code_hint: "Python code building a py3Dmol.view assigned to `view`",
            title: "molecule_view",
            modules: &["py3Dmol"],
            epilogue: "view.write_html(OUTPUT_PATH)",
        },
    ];

    specs
        .iter()
        .map(|s| {
            let d = ToolDescriptor::new(s.name, s.description, s.domain, s.kind)
                .formats(s.formats)
                .with_chart_params(s.code_hint, s.title);
            let requirements = s.modules.iter().map(|m| Requirement::python_module(m)).collect();
            CatalogEntry::new(
                d,
                RenderBackend::Command(CommandBackend::python(python, s.epilogue)),
                requirements,
            )
        })
        .collect()
}

fn script_tag(src: &str) -> String {
    format!(r#"<script src="{}"></script>"#, src)
}

fn html_tools() -> Vec<CatalogEntry> {
    let container = r#"<div id="chart" style="width:{{width}}px;height:{{height}}px;margin:0 auto"></div>"#;
    let mut entries = Vec::new();

    let d = ToolDescriptor::new(
        "d3_render",
        "Embed D3.js v7 code in an interactive page; draw into the element #chart.",
        DomainTag::Custom,
        OutputKind::InteractiveDocument,
    )
    .formats(&["html"])
    .with_chart_params("JavaScript using the global `d3`, drawing into '#chart'", "d3_chart");
    entries.push(CatalogEntry::new(
        d,
        RenderBackend::Html(HtmlBackend::new(
            "d3",
            &script_tag(D3_CDN),
            &format!("{}\n<script>\n{{{{code}}}}\n</script>", container),
            CodeEmbedding::Script,
        )),
        vec![Requirement::endpoint(D3_CDN)],
    ));

    let d = ToolDescriptor::new(
        "echarts_render",
        "Render an Apache ECharts option object as an interactive chart page.",
        DomainTag::Statistical,
        OutputKind::InteractiveDocument,
    )
    .formats(&["html"])
    .with_chart_params("ECharts option as a JavaScript object literal", "echarts_chart");
    entries.push(CatalogEntry::new(
        d,
        RenderBackend::Html(HtmlBackend::new(
            "echarts",
            &script_tag(ECHARTS_CDN),
            &format!(
                "{}\n<script>\nvar chart = echarts.init(document.getElementById('chart'));\nvar option = {{{{code}}}};\nchart.setOption(option);\nwindow.addEventListener('resize', function () {{ chart.resize(); }});\n</script>",
                container
            ),
            CodeEmbedding::Script,
        )),
        vec![Requirement::endpoint(ECHARTS_CDN)],
    ));

    let d = ToolDescriptor::new(
        "threejs_render",
        "Embed three.js code in an interactive 3D page; `scene`, `camera`, `renderer` and `THREE` are predefined.",
        DomainTag::ThreeD,
        OutputKind::InteractiveDocument,
    )
    .formats(&["html"])
    .with_chart_params("JavaScript adding objects to `scene`; may define animate()", "threejs_scene");
    let three_head = format!(
        "<style>body {{ margin: 0; overflow: hidden; }} canvas {{ display: block; }}</style>\n\
         <script type=\"importmap\">{{\"imports\": {{\"three\": \"{}\"}}}}</script>",
        THREE_CDN
    );
    let three_body = "<script type=\"module\">\n\
        import * as THREE from 'three';\n\
        const scene = new THREE.Scene();\n\
        scene.background = new THREE.Color(0xffffff);\n\
        const camera = new THREE.PerspectiveCamera(75, {{width}} / {{height}}, 0.1, 1000);\n\
        camera.position.set(5, 5, 10);\n\
        camera.lookAt(0, 0, 0);\n\
        const renderer = new THREE.WebGLRenderer({ antialias: true });\n\
        renderer.setSize({{width}}, {{height}});\n\
        document.body.appendChild(renderer.domElement);\n\
        scene.add(new THREE.AmbientLight(0x666666, 2));\n\
        const light = new THREE.DirectionalLight(0xffffff, 1.5);\n\
        light.position.set(5, 10, 7.5);\n\
        scene.add(light);\n\
        let animate = null;\n\
        {{code}}\n\
        function loop() { requestAnimationFrame(loop); if (typeof animate === 'function') animate(); renderer.render(scene, camera); }\n\
        loop();\n\
        </script>";
    entries.push(CatalogEntry::new(
        d,
        RenderBackend::Html(HtmlBackend::new("three.js", &three_head, three_body, CodeEmbedding::Script)),
        vec![Requirement::endpoint(THREE_CDN)],
    ));

    let d = ToolDescriptor::new(
        "dygraphs_render",
        "Render CSV time-series data as an interactive dygraphs chart with zoom and range selection.",
        DomainTag::TimeSeries,
        OutputKind::InteractiveDocument,
    )
    .formats(&["html"])
    .with_chart_params("CSV text with a header row; the first column is the time axis", "timeseries_chart");
    entries.push(CatalogEntry::new(
        d,
        RenderBackend::Html(HtmlBackend::new(
            "dygraphs",
            &script_tag(DYGRAPHS_CDN),
            &format!(
                "{}\n<script>\nnew Dygraph(document.getElementById('chart'), {{{{code}}}}, {{ showRangeSelector: true }});\n</script>",
                container
            ),
            CodeEmbedding::JsonString,
        )),
        vec![Requirement::endpoint(DYGRAPHS_CDN)],
    ));

    let d = ToolDescriptor::new(
        "flowchartjs_render",
        "Render flowchart.js DSL (st=>start, op=>operation, cond=>condition) as an SVG flowchart page.",
        DomainTag::Flowchart,
        OutputKind::InteractiveDocument,
    )
    .formats(&["html"])
    .with_chart_params("flowchart.js DSL source", "flowchart");
    entries.push(CatalogEntry::new(
        d,
        RenderBackend::Html(HtmlBackend::new(
            "flowchart.js",
            &format!("{}\n{}", script_tag(RAPHAEL_CDN), script_tag(FLOWCHART_CDN)),
            &format!(
                "{}\n<script>\nflowchart.parse({{{{code}}}}).drawSVG('chart');\n</script>",
                container
            ),
            CodeEmbedding::JsonString,
        )),
        vec![Requirement::endpoint(RAPHAEL_CDN), Requirement::endpoint(FLOWCHART_CDN)],
    ));

    entries
}
