// Copyright (c) 2024 Mike Tsao

use crate::{
    types::{Caps, ElementId, PadId, ParamValue, UidFactory},
    unit::{factories, PadCounts, PadDirection, Pipeline, PipelineError},
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug)]
struct TestElement {
    factory: String,
    name: String,
    properties: BTreeMap<String, ParamValue>,
    takes_caps: bool,
    caps: Option<Caps>,
    src: Option<PadId>,
    sink: Option<PadId>,
    request_direction: Option<PadDirection>,
}

#[derive(Debug)]
struct TestPad {
    element: ElementId,
    direction: PadDirection,
    is_request: bool,
}

/// An in-memory [Pipeline] that keeps track of elements, pads, and links
/// without moving any audio. Link failures can be injected to exercise
/// rollback paths.
#[derive(Debug, Default)]
pub struct TestPipeline {
    element_uid_factory: UidFactory<ElementId>,
    pad_uid_factory: UidFactory<PadId>,
    elements: FxHashMap<ElementId, TestElement>,
    pads: FxHashMap<PadId, TestPad>,
    links: BTreeSet<(PadId, PadId)>,
    missing_factories: FxHashSet<String>,

    /// Whether adders made from now on have their own `caps` property, so
    /// no separate caps filter is needed.
    pub adder_has_caps: bool,

    link_failure_countdown: Option<usize>,
    links_fail: bool,
}
impl TestPipeline {
    /// Makes the `n`th link call from now (counting from zero) fail, once.
    pub fn fail_nth_link(&mut self, n: usize) {
        self.link_failure_countdown = Some(n);
    }

    /// Makes every link call fail until turned off.
    pub fn set_links_fail(&mut self, links_fail: bool) {
        self.links_fail = links_fail;
    }

    /// Cancels any injected link failures.
    pub fn clear_link_failures(&mut self) {
        self.link_failure_countdown = None;
        self.links_fail = false;
    }

    /// Makes the named factory unavailable, as if its plugin weren't
    /// installed.
    pub fn remove_factory(&mut self, factory: &str) {
        self.missing_factories.insert(factory.to_string());
    }

    /// Every current link as a (src, sink) pair, in a stable order.
    pub fn links(&self) -> Vec<(PadId, PadId)> {
        self.links.iter().copied().collect()
    }

    #[allow(missing_docs)]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Finds an element by the name it was created with.
    pub fn element_named(&self, name: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(id, _)| *id)
    }

    /// The factory an element was made from. Units report "unit".
    pub fn factory_of(&self, element: ElementId) -> Option<&str> {
        self.elements.get(&element).map(|e| e.factory.as_str())
    }

    /// The caps last written to an element.
    pub fn caps(&self, element: ElementId) -> Option<&Caps> {
        self.elements.get(&element).and_then(|e| e.caps.as_ref())
    }

    #[allow(missing_docs)]
    pub fn element_of_pad(&self, pad: PadId) -> Option<ElementId> {
        self.pads.get(&pad).map(|p| p.element)
    }

    /// How many request pads an element currently has out.
    pub fn request_pad_count(&self, element: ElementId) -> usize {
        self.pads
            .values()
            .filter(|p| p.element == element && p.is_request)
            .count()
    }

    fn add_element(
        &mut self,
        factory: &str,
        name: &str,
        pads: PadCounts,
        request_direction: Option<PadDirection>,
    ) -> ElementId {
        let element = self.element_uid_factory.mint_next();
        let src = (pads.src > 0).then(|| self.add_pad(element, PadDirection::Src, false));
        let sink = (pads.sink > 0).then(|| self.add_pad(element, PadDirection::Sink, false));
        self.elements.insert(
            element,
            TestElement {
                factory: factory.to_string(),
                name: name.to_string(),
                properties: Default::default(),
                takes_caps: false,
                caps: None,
                src,
                sink,
                request_direction,
            },
        );
        element
    }

    fn add_pad(&mut self, element: ElementId, direction: PadDirection, is_request: bool) -> PadId {
        let pad = self.pad_uid_factory.mint_next();
        self.pads.insert(
            pad,
            TestPad {
                element,
                direction,
                is_request,
            },
        );
        pad
    }

    fn unlink_all(&mut self, pad: PadId) {
        self.links.retain(|(src, sink)| *src != pad && *sink != pad);
    }

    fn is_linked(&self, pad: PadId) -> bool {
        self.peer(pad).is_some()
    }

    fn refuse(src: PadId, sink: PadId, reason: &str) -> PipelineError {
        PipelineError::LinkRefused {
            src,
            sink,
            reason: reason.to_string(),
        }
    }
}
impl Pipeline for TestPipeline {
    fn make_element(&mut self, factory: &str, name: &str) -> Result<ElementId, PipelineError> {
        if self.missing_factories.contains(factory) {
            return Err(PipelineError::NoSuchFactory(factory.to_string()));
        }
        let both = PadCounts { src: 1, sink: 1 };
        let (pads, request_direction, properties, takes_caps): (_, _, Vec<(&str, ParamValue)>, _) =
            match factory {
                factories::ADDER => (
                    PadCounts { src: 1, sink: 0 },
                    Some(PadDirection::Sink),
                    vec![],
                    self.adder_has_caps,
                ),
                factories::TEE => (
                    PadCounts { src: 0, sink: 1 },
                    Some(PadDirection::Src),
                    vec![],
                    false,
                ),
                factories::CAPS_FILTER => (both, None, vec![], true),
                factories::AUDIO_CONVERT => (
                    both,
                    None,
                    vec![
                        ("dithering", ParamValue::Int(1)),
                        ("noise-shaping", ParamValue::Int(1)),
                    ],
                    false,
                ),
                factories::LEVEL => (
                    both,
                    None,
                    vec![
                        ("interval", ParamValue::UInt(0)),
                        ("peak-ttl", ParamValue::UInt(0)),
                        ("peak-falloff", ParamValue::Double(0.0)),
                        ("message", ParamValue::Boolean(false)),
                    ],
                    false,
                ),
                factories::VOLUME => (
                    both,
                    None,
                    vec![
                        ("mute", ParamValue::Boolean(false)),
                        ("volume", ParamValue::Double(1.0)),
                    ],
                    false,
                ),
                factories::QUEUE => (both, None, vec![], false),
                _ => return Err(PipelineError::NoSuchFactory(factory.to_string())),
            };
        let element = self.add_element(factory, name, pads, request_direction);
        if let Some(e) = self.elements.get_mut(&element) {
            e.takes_caps = takes_caps;
            e.properties = properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
        }
        Ok(element)
    }

    fn add_unit(&mut self, name: &str, pads: PadCounts) -> Result<ElementId, PipelineError> {
        Ok(self.add_element("unit", name, pads, None))
    }

    fn remove_element(&mut self, element: ElementId) {
        let pads: Vec<PadId> = self
            .pads
            .iter()
            .filter(|(_, p)| p.element == element)
            .map(|(id, _)| *id)
            .collect();
        for pad in pads {
            self.unlink_all(pad);
            self.pads.remove(&pad);
        }
        self.elements.remove(&element);
    }

    fn has_property(&self, element: ElementId, name: &str) -> bool {
        self.elements
            .get(&element)
            .is_some_and(|e| (name == "caps" && e.takes_caps) || e.properties.contains_key(name))
    }

    fn property(&self, element: ElementId, name: &str) -> Option<ParamValue> {
        self.elements
            .get(&element)
            .and_then(|e| e.properties.get(name))
            .cloned()
    }

    fn set_property(
        &mut self,
        element: ElementId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), PipelineError> {
        let e = self
            .elements
            .get_mut(&element)
            .ok_or(PipelineError::NoSuchElement(element))?;
        match e.properties.get_mut(name) {
            Some(v) => {
                *v = value;
                Ok(())
            }
            None => Err(PipelineError::NoSuchProperty {
                element,
                name: name.to_string(),
            }),
        }
    }

    fn set_caps(&mut self, element: ElementId, caps: &Caps) -> Result<(), PipelineError> {
        let e = self
            .elements
            .get_mut(&element)
            .ok_or(PipelineError::NoSuchElement(element))?;
        if !e.takes_caps {
            return Err(PipelineError::NoSuchProperty {
                element,
                name: "caps".to_string(),
            });
        }
        e.caps = Some(caps.clone());
        Ok(())
    }

    fn static_pad(&self, element: ElementId, direction: PadDirection) -> Option<PadId> {
        let e = self.elements.get(&element)?;
        match direction {
            PadDirection::Src => e.src,
            PadDirection::Sink => e.sink,
        }
    }

    fn request_pad(
        &mut self,
        element: ElementId,
        direction: PadDirection,
    ) -> Result<PadId, PipelineError> {
        let e = self
            .elements
            .get(&element)
            .ok_or(PipelineError::NoSuchElement(element))?;
        if e.request_direction != Some(direction) {
            return Err(PipelineError::NoRequestPads { element, direction });
        }
        Ok(self.add_pad(element, direction, true))
    }

    fn release_pad(&mut self, pad: PadId) {
        if self.pads.get(&pad).is_some_and(|p| p.is_request) {
            self.unlink_all(pad);
            self.pads.remove(&pad);
        }
    }

    fn link(&mut self, src: PadId, sink: PadId) -> Result<(), PipelineError> {
        if self.links_fail {
            return Err(Self::refuse(src, sink, "links are failing"));
        }
        if let Some(countdown) = self.link_failure_countdown {
            if countdown == 0 {
                self.link_failure_countdown = None;
                return Err(Self::refuse(src, sink, "injected failure"));
            }
            self.link_failure_countdown = Some(countdown - 1);
        }
        let src_pad = self.pads.get(&src).ok_or(PipelineError::NoSuchPad(src))?;
        let sink_pad = self.pads.get(&sink).ok_or(PipelineError::NoSuchPad(sink))?;
        if src_pad.direction != PadDirection::Src || sink_pad.direction != PadDirection::Sink {
            return Err(Self::refuse(src, sink, "wrong pad directions"));
        }
        if self.is_linked(src) || self.is_linked(sink) {
            return Err(Self::refuse(src, sink, "already linked"));
        }
        self.links.insert((src, sink));
        Ok(())
    }

    fn unlink(&mut self, src: PadId, sink: PadId) -> bool {
        self.links.remove(&(src, sink))
    }

    fn peer(&self, pad: PadId) -> Option<PadId> {
        self.links.iter().find_map(|(src, sink)| {
            if *src == pad {
                Some(*sink)
            } else if *sink == pad {
                Some(*src)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_exclusive_and_directional() {
        let mut p = TestPipeline::default();
        let a = p.make_element(factories::QUEUE, "a").unwrap();
        let b = p.make_element(factories::QUEUE, "b").unwrap();
        let c = p.make_element(factories::QUEUE, "c").unwrap();
        let a_src = p.static_pad(a, PadDirection::Src).unwrap();
        let b_sink = p.static_pad(b, PadDirection::Sink).unwrap();
        let c_sink = p.static_pad(c, PadDirection::Sink).unwrap();

        assert!(p.link(b_sink, a_src).is_err(), "direction matters");
        assert!(p.link(a_src, b_sink).is_ok());
        assert!(p.link(a_src, c_sink).is_err(), "a pad has one peer");
        assert_eq!(p.peer(b_sink), Some(a_src));

        p.remove_element(b);
        assert!(p.peer(a_src).is_none(), "removal unlinks");
        assert_eq!(p.element_count(), 2);
    }

    #[test]
    fn injected_failures_fire_once() {
        let mut p = TestPipeline::default();
        let pads: Vec<(PadId, PadId)> = (0..3)
            .map(|i| {
                let e = p.make_element(factories::QUEUE, &format!("q{i}")).unwrap();
                (
                    p.static_pad(e, PadDirection::Src).unwrap(),
                    p.static_pad(e, PadDirection::Sink).unwrap(),
                )
            })
            .collect();
        p.fail_nth_link(1);
        assert!(p.link(pads[0].0, pads[1].1).is_ok());
        assert!(p.link(pads[1].0, pads[2].1).is_err());
        assert!(p.link(pads[1].0, pads[2].1).is_ok());
    }

    #[test]
    fn request_pads_come_and_go() {
        let mut p = TestPipeline::default();
        let adder = p.make_element(factories::ADDER, "mix").unwrap();
        assert!(p.static_pad(adder, PadDirection::Sink).is_none());
        let pad = p.request_pad(adder, PadDirection::Sink).unwrap();
        assert_eq!(p.request_pad_count(adder), 1);
        assert!(p.request_pad(adder, PadDirection::Src).is_err());
        p.release_pad(pad);
        assert_eq!(p.request_pad_count(adder), 0);

        let src = p.static_pad(adder, PadDirection::Src).unwrap();
        p.release_pad(src);
        assert_eq!(
            p.static_pad(adder, PadDirection::Src),
            Some(src),
            "static pads can't be released"
        );
        assert!(!p.has_property(adder, "caps"));
        p.remove_factory(factories::ADDER);
        assert!(p.make_element(factories::ADDER, "mix2").is_err());
    }
}
