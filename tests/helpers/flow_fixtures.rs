//! Common flow documents for tests.

/// Action state `A` with one action, going to view state `B` on "success".
pub const ORDER_FLOW: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<flow start-state="A">
  <action-state id="A">
    <action bean="orders" method="place"/>
    <transition on="success" to="B"/>
  </action-state>
  <view-state id="B" view="confirmation"/>
</flow>"#;

/// Same as [`ORDER_FLOW`] but the transition targets a missing state.
pub const DANGLING_FLOW: &str = r#"<flow start-state="A">
  <action-state id="A">
    <action bean="orders" method="place"/>
    <transition on="success" to="C"/>
  </action-state>
  <view-state id="B" view="confirmation"/>
</flow>"#;

/// First-generation document: start state declared through a marker.
pub const MARKER_FLOW: &str = r#"<flow xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.springframework.org/schema/webflow http://www.springframework.org/schema/webflow/spring-webflow-1.0.xsd">
  <start-state idref="A"/>
  <action-state id="A">
    <action bean="orders" method="place"/>
    <transition on="success" to="B"/>
    <transition on="retry" to="A"/>
  </action-state>
  <view-state id="B" view="confirmation">
    <transition on="back" to="A"/>
  </view-state>
  <end-state id="done"/>
</flow>"#;

/// A document touching most element kinds.
pub const RICH_FLOW: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- checkout -->
<flow start-state="enter">
  <attribute name="caption" value="Checkout"/>
  <var name="cart" class="com.acme.Cart" scope="conversation"/>
  <input-mapper>
    <input-attribute name="customerId" scope="flow"/>
    <mapping source="requestParameters.coupon" target="flowScope.coupon" to="string"/>
  </input-mapper>
  <start-actions>
    <evaluate-action expression="cart.reset()">
      <evaluation-result name="resetDone" scope="flash"/>
    </evaluate-action>
  </start-actions>
  <view-state id="enter" view="cart">
    <entry-actions><set attribute="step" value="1" scope="flow"/></entry-actions>
    <render-actions><bean-action bean="cartService" method="load"/></render-actions>
    <transition on="submit" to="check">
      <action bean="cartService" method="validate"/>
    </transition>
  </view-state>
  <decision-state id="check">
    <if test="cart.empty" then="enter" else="ship"/>
  </decision-state>
  <subflow-state id="ship" flow="shipping">
    <attribute-mapper>
      <output-mapper><output-attribute name="address" scope="conversation"/></output-mapper>
    </attribute-mapper>
    <transition on="done" to="end"/>
  </subflow-state>
  <end-state id="end" view="thanks"/>
  <global-transitions>
    <transition on="cancel" to="end"/>
  </global-transitions>
  <exception-handler bean="errors"/>
  <import resource="checkout-beans.xml"/>
  <inline-flow id="shipping">
    <flow start-state="pick">
      <view-state id="pick" view="address"><transition on="ok" to="pick-done"/></view-state>
      <end-state id="pick-done"/>
    </flow>
  </inline-flow>
</flow>"#;
