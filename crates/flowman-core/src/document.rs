//! Canonical markup form of a process diagram.

use std::fmt;

/// The default starter diagram: one executable-false process with a single
/// start event, plus the DI shape so the surface has something to draw.
const STARTER_BPMN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn2:definitions xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:bpmn2="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI" id="sample-diagram" targetNamespace="http://bpmn.io/schema/bpmn" xsi:schemaLocation="http://www.omg.org/spec/BPMN/20100524/MODEL BPMN20.xsd">
  <bpmn2:process id="Process_1" isExecutable="false">
    <bpmn2:startEvent id="StartEvent_1"/>
  </bpmn2:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1">
      <bpmndi:BPMNShape id="_BPMNShape_StartEvent_2" bpmnElement="StartEvent_1">
        <dc:Bounds height="36.0" width="36.0" x="412.0" y="240.0"/>
      </bpmndi:BPMNShape>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn2:definitions>"#;

/// A BPMN 2.0 XML document, the canonical interchange form of a diagram.
///
/// A session holds at most one current document. Documents are replaced
/// wholesale on a successful import, never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramDocument(String);

impl DiagramDocument {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// The built-in default document every session starts from.
    pub fn starter() -> Self {
        Self(STARTER_BPMN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for DiagramDocument {
    fn from(markup: String) -> Self {
        Self(markup)
    }
}

impl AsRef<str> for DiagramDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagramDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
