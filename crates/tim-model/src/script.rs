//! Export a translated model as an equivalent solver script.

use std::collections::BTreeMap;
use std::fmt::Write;

use tim_common::GridSpec;

use crate::element::{Element, Kwarg};
use crate::spec::ModelSpecification;

fn python_float(v: f64) -> String {
    if v.is_nan() {
        "np.nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "np.inf" } else { "-np.inf" }.to_string()
    } else {
        format!("{:?}", v)
    }
}

fn python_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn python_value(value: &Kwarg) -> String {
    match value {
        Kwarg::Float(v) => python_float(*v),
        Kwarg::Integer(v) => v.to_string(),
        Kwarg::Text(s) => python_str(s),
        Kwarg::FloatList(values) => {
            let items: Vec<_> = values.iter().map(|v| python_float(*v)).collect();
            format!("[{}]", items.join(", "))
        }
        Kwarg::Coords(coords) => {
            let items: Vec<_> = coords
                .iter()
                .map(|c| format!("({}, {})", python_float(c.x), python_float(c.y)))
                .collect();
            format!("[{}]", items.join(", "))
        }
        Kwarg::Raw(s) => s.clone(),
    }
}

fn call(class: &str, kwargs: &[(&str, Kwarg)]) -> String {
    let args: Vec<_> = kwargs
        .iter()
        .map(|(name, value)| format!("{}={}", name, python_value(value)))
        .collect();
    format!("timml.{}({})", class, args.join(", "))
}

/// Render `elements` (as produced by `translate(spec)`) as a solver script.
///
/// The script builds the model, solves it and samples the head on the same
/// grid the compute server would write.
pub fn to_script(spec: &ModelSpecification, elements: &[Element]) -> String {
    let mut out = String::new();
    out.push_str("import numpy as np\nimport timml\n\n");

    let mut counters: BTreeMap<&'static str, usize> = BTreeMap::new();
    for element in elements {
        let Some(class) = element.solver_class() else {
            continue;
        };
        let kwargs = element.kwargs();
        if let Element::Aquifer(_) = element {
            let _ = writeln!(out, "model = {}", call(class, &kwargs));
            continue;
        }

        let name = element.kind().as_str();
        let index = counters.entry(name).or_insert(0);
        let mut with_model = vec![("model", Kwarg::Raw("model".to_string()))];
        with_model.extend(kwargs);
        let _ = writeln!(out, "{}_{} = {}", name, index, call(class, &with_model));
        *index += 1;
    }

    let cellsize = spec.cellsize();
    let extent = GridSpec::from_extent(&spec.domain(), cellsize)
        .map(|grid| grid.extent)
        .unwrap_or_else(|_| spec.domain());
    let (xmin, xmax, ymin, ymax) = extent.extent();
    let cs = python_float(cellsize);

    out.push_str("\nmodel.solve()\n\n");
    let mut observed = 0;
    for element in elements {
        if let Element::Observation(e) = element {
            let _ = writeln!(
                out,
                "observation_{} = model.head(x={}, y={})",
                observed,
                python_float(e.x),
                python_float(e.y)
            );
            observed += 1;
        }
    }
    if observed > 0 {
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "xg = np.arange({}, {}, {}) + 0.5 * {}",
        python_float(xmin),
        python_float(xmax),
        cs,
        cs
    );
    let _ = writeln!(
        out,
        "yg = np.arange({}, {}, -{}) - 0.5 * {}",
        python_float(ymax),
        python_float(ymin),
        cs,
        cs
    );
    out.push_str("head = model.headgrid(xg=xg, yg=yg)\n");
    out
}
